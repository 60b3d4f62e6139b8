//! Internal routing messages for the relay sender task.

use voxrelay_protocol::Envelope;

/// Routes outbound traffic through the single WebSocket sender task.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayRoute {
    /// Serialize and send an envelope as a text frame
    Envelope(Envelope),
    /// Close the WebSocket connection
    Close,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_carries_envelope() {
        let route = RelayRoute::Envelope(Envelope::Pong);
        match route {
            RelayRoute::Envelope(Envelope::Pong) => {}
            _ => panic!("Expected Pong envelope route"),
        }
    }

    #[test]
    fn test_close_route_equality() {
        assert_eq!(RelayRoute::Close, RelayRoute::Close);
    }
}
