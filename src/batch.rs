//! Batch conversion of dump/get results.
//!
//! A dump answer arrives as many netlink messages, one Flow each. The
//! result set is all-or-nothing: one bad message fails the whole batch.

use crate::error::Result;
use crate::flow::Flow;
use crate::netfilter::{unmarshal_netlink, Message};

/// Decode a single Flow from a netfilter message.
pub fn decode_flow(message: &Message) -> Result<Flow> {
    let (_, attrs) = unmarshal_netlink(message)?;
    Flow::decode(&attrs)
}

/// Decode a list of messages into Flows, preserving order.
///
/// # Errors
///
/// Returns the first message's error; no partial list is returned.
///
/// # Example
///
/// ```
/// use std::net::{IpAddr, Ipv4Addr};
/// use conntrack_codec::{decode_flows, Flow, RequestBuilder};
///
/// let a = IpAddr::V4(Ipv4Addr::new(192, 168, 0, 1));
/// let b = IpAddr::V4(Ipv4Addr::new(192, 168, 0, 2));
/// let messages: Vec<_> = (1..=3u16)
///     .map(|port| {
///         let flow = Flow::new(17, 0, a, b, port, 53, 30, 0);
///         RequestBuilder::create().build(&flow).unwrap()
///     })
///     .collect();
///
/// let flows = decode_flows(&messages).unwrap();
/// assert_eq!(flows.len(), 3);
/// assert_eq!(flows[2].tuple_orig.proto.source_port, 3);
/// ```
pub fn decode_flows(messages: &[Message]) -> Result<Vec<Flow>> {
    let mut out = Vec::with_capacity(messages.len());

    for (index, message) in messages.iter().enumerate() {
        match decode_flow(message) {
            Ok(flow) => {
                tracing::trace!(index, id = flow.id, "decoded flow");
                out.push(flow);
            }
            Err(e) => {
                tracing::debug!(index, total = messages.len(), "discarding batch: {}", e);
                return Err(e);
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConntrackError;
    use crate::netfilter::{marshal_netlink, Attribute, Header};
    use crate::types::{family, message_type, NFNL_SUBSYS_CTNETLINK};
    use std::net::{IpAddr, Ipv4Addr};

    fn header() -> Header {
        Header {
            subsystem: NFNL_SUBSYS_CTNETLINK,
            message_type: message_type::NEW,
            family: family::INET,
            ..Default::default()
        }
    }

    fn flow_message(mark: u32) -> Message {
        let flow = Flow::new(
            6,
            0,
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
            4000,
            443,
            60,
            mark,
        );
        marshal_netlink(&header(), &flow.encode().unwrap()).unwrap()
    }

    #[test]
    fn test_decode_flow() {
        let flow = decode_flow(&flow_message(11)).unwrap();
        assert_eq!(flow.mark, 11);
        assert_eq!(flow.tuple_orig.proto.destination_port, 443);
    }

    #[test]
    fn test_decode_flows_preserves_order() {
        let messages: Vec<Message> = (1..=5).map(flow_message).collect();
        let flows = decode_flows(&messages).unwrap();

        let marks: Vec<u32> = flows.iter().map(|f| f.mark).collect();
        assert_eq!(marks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_decode_flows_all_or_nothing() {
        let bad = marshal_netlink(&header(), &[Attribute::u32(99, 0)]).unwrap();

        for k in 0..4 {
            let mut messages: Vec<Message> = (1..=4).map(flow_message).collect();
            messages[k] = bad.clone();
            assert_eq!(
                decode_flows(&messages).unwrap_err(),
                ConntrackError::UnknownAttribute(99)
            );
        }
    }

    #[test]
    fn test_decode_flows_first_error_wins() {
        let messages = vec![
            flow_message(1),
            marshal_netlink(&header(), &[Attribute::u32(42, 0)]).unwrap(),
            marshal_netlink(&header(), &[Attribute::u32(43, 0)]).unwrap(),
        ];
        assert_eq!(
            decode_flows(&messages).unwrap_err(),
            ConntrackError::UnknownAttribute(42)
        );
    }

    #[test]
    fn test_decode_flows_empty() {
        assert!(decode_flows(&[]).unwrap().is_empty());
    }
}
