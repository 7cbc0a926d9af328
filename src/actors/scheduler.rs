//! One poll cycle over a device's parameter set.
//!
//! The scheduler issues each parameter's command over the shared
//! [`DeviceLink`], sequentially and in parameter iteration order.
//! RS232-over-TCP gateways expose a single serial port and do not
//! multiplex, so concurrent exchanges against one device are off the
//! table. A failed parameter never takes the rest of the cycle with it,
//! with one exception: a socket-level error means the connection itself
//! is gone, so the cycle aborts and the poller reconnects.

use std::fmt;
use std::time::Duration;

use tracing::{trace, warn};

use crate::link::{DeviceLink, LinkError};
use crate::protocol::{self, ParseError};
use crate::store::Parameter;

/// Why one parameter produced no value this cycle. Scoped to that
/// parameter; the cycle continues.
#[derive(Debug)]
pub enum ParameterError {
    /// The response carried no extractable number.
    Parse(ParseError),

    /// No complete response arrived within the response timeout.
    Timeout,
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterError::Parse(e) => write!(f, "{e}"),
            ParameterError::Timeout => write!(f, "response timed out"),
        }
    }
}

impl std::error::Error for ParameterError {}

/// Outcome for one parameter within a cycle.
#[derive(Debug)]
pub struct CycleOutcome {
    pub parameter: Parameter,
    pub result: Result<f64, ParameterError>,
}

/// Drives the parameter set of one device through poll cycles.
///
/// The scheduler itself never retries; recovery policy lives in the
/// poller that owns it.
#[derive(Debug, Clone)]
pub struct ParameterScheduler {
    parameters: Vec<Parameter>,
    response_timeout: Duration,
}

impl ParameterScheduler {
    pub fn new(parameters: Vec<Parameter>, response_timeout: Duration) -> Self {
        Self {
            parameters,
            response_timeout,
        }
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Run one cycle: exchange + decode for every parameter, in order.
    ///
    /// Returns per-parameter outcomes on completion. Returns
    /// `Err(LinkError)` only when the connection itself failed
    /// (connect-class or socket-level error); the link is stale and the
    /// remaining parameters are not attempted.
    pub async fn run_cycle(&self, link: &mut DeviceLink) -> Result<Vec<CycleOutcome>, LinkError> {
        let mut outcomes = Vec::with_capacity(self.parameters.len());

        for parameter in &self.parameters {
            let result = match link.exchange(&parameter.command, self.response_timeout).await {
                Ok(raw) => {
                    trace!("{}: {} -> {:?}", link.peer(), parameter.name, raw.trim_end());
                    protocol::extract_value(&raw).map_err(ParameterError::Parse)
                }
                Err(LinkError::Timeout(_)) => {
                    warn!("{}: {}: no response within deadline", link.peer(), parameter.name);
                    Err(ParameterError::Timeout)
                }
                Err(e) => return Err(e),
            };

            outcomes.push(CycleOutcome {
                parameter: parameter.clone(),
                result,
            });
        }

        Ok(outcomes)
    }
}
