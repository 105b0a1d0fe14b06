//! Poll request encoding and response decoding for the live feed.

use chrono_tz::Tz;
use sbpro_types::Tick;

use crate::{DecodeError, decode_live_tick};

/// Response meaning the server is terminating the session.
pub const SHUTDOWN_SIGNAL: &str = "killapp";

/// Empty placeholder entry in a tick list.
pub const PLACEHOLDER: &str = "*";

/// Ticks decoded from one poll response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickBatch {
    /// Decoded ticks in response order.
    pub ticks: Vec<Tick>,
    /// Highest tick number in the batch, `0` if the batch is empty.
    pub max_sequence: u64,
}

impl TickBatch {
    /// Returns true if the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Returns the number of ticks in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ticks.len()
    }
}

/// A decoded poll response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamResponse {
    /// The server asked the client to drop the session.
    Shutdown,
    /// Tick data (possibly empty).
    Ticks(TickBatch),
}

/// Builds the poll request asking for ticks newer than `cursor`.
///
/// ```
/// use sbpro_wire::poll_request;
///
/// assert_eq!(poll_request("6E", "03-20", 31412), "ticks:6E 03-20;6E 03-20;31412|");
/// ```
#[must_use]
pub fn poll_request(pair: &str, contract: &str, cursor: u64) -> String {
    format!("ticks:{pair} {contract};{pair} {contract};{cursor}|")
}

/// Decodes a poll response of the form `header:tick1|tick2|...|*`.
///
/// # Errors
///
/// Returns an error if the response is not `header:tickList` or any tick
/// entry fails to decode.
pub fn decode_stream_response(
    response: &str,
    pair: &str,
    contract: &str,
    divisor: f64,
    tz: Tz,
) -> Result<StreamResponse, DecodeError> {
    if response == SHUTDOWN_SIGNAL {
        return Ok(StreamResponse::Shutdown);
    }

    let fields: Vec<&str> = response.split(':').collect();
    let [_header, tick_list] = fields.as_slice() else {
        return Err(DecodeError::ResponseShape {
            count: fields.len(),
            response: response.to_string(),
        });
    };

    let mut batch = TickBatch::default();
    for entry in tick_list.split('|') {
        if entry == PLACEHOLDER {
            continue;
        }

        let tick = decode_live_tick(entry, pair, contract, divisor, tz)?;
        batch.max_sequence = batch.max_sequence.max(tick.number);
        batch.ticks.push(tick);
    }

    Ok(StreamResponse::Ticks(batch))
}
