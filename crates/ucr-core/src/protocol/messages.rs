//! UCR protocol message kinds and wire documents.
//!
//! Every datagram is one structured document (a string-keyed map).  The
//! `MsgType` field selects the message kind; the remaining fields depend on
//! the kind.  Inbound documents are parsed leniently into
//! [`InboundDocument`] and then classified into a [`Request`]; outbound
//! documents are built as [`OutboundDocument`] values.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::channel::{Category, Value};
use crate::domain::registry::Descriptor;
use crate::domain::store::InputSnapshot;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Default UDP port the device listens on.
pub const DEFAULT_PORT: u16 = 8080;

/// Maximum hostname length in bytes carried in outbound documents.
pub const MAX_HOSTNAME_LEN: usize = 31;

// ── Message type codes ────────────────────────────────────────────────────────

/// All message type codes defined by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    HeartbeatRequest = 0,
    /// Doubles as the generic acknowledgement.
    HeartbeatResponse = 1,
    DescriptorListRequest = 2,
    DescriptorListResponse = 3,
    SetOutputs = 4,
    SubscribeToInputs = 5,
    UnsubscribeFromInputs = 6,
    UpdateSubscriber = 7,
    BindStart = 8,
    BindStop = 9,
    BindResponse = 10,
}

impl TryFrom<i64> for MessageKind {
    type Error = ();

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageKind::HeartbeatRequest),
            1 => Ok(MessageKind::HeartbeatResponse),
            2 => Ok(MessageKind::DescriptorListRequest),
            3 => Ok(MessageKind::DescriptorListResponse),
            4 => Ok(MessageKind::SetOutputs),
            5 => Ok(MessageKind::SubscribeToInputs),
            6 => Ok(MessageKind::UnsubscribeFromInputs),
            7 => Ok(MessageKind::UpdateSubscriber),
            8 => Ok(MessageKind::BindStart),
            9 => Ok(MessageKind::BindStop),
            10 => Ok(MessageKind::BindResponse),
            _ => Err(()),
        }
    }
}

// ── Inbound documents ─────────────────────────────────────────────────────────

/// A raw inbound document.
///
/// Only `MsgType` decides whether a datagram is usable.  Unknown fields are
/// ignored, and the category arrays are read leniently because their shape
/// only matters for `SET_OUTPUTS`: a category key that is not an array reads
/// as empty, and array elements that are not `{ Index, Value }` maps are
/// skipped.  A `MsgType` that is not an integer reads as unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundDocument {
    #[serde(rename = "MsgType", default, deserialize_with = "lenient_msg_type")]
    pub msg_type: Option<i64>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub b: Vec<OutputEntry>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub a: Vec<OutputEntry>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub d: Vec<OutputEntry>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub e: Vec<OutputEntry>,
}

/// One `{ Index, Value }` pair of a `SET_OUTPUTS` request.  A missing field
/// reads as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEntry {
    #[serde(rename = "Index", default)]
    pub index: i64,
    #[serde(rename = "Value", default)]
    pub value: WireValue,
}

fn lenient_msg_type<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Int(i64),
        Other(IgnoredAny),
    }

    Ok(match Code::deserialize(deserializer)? {
        Code::Int(code) => Some(code),
        Code::Other(_) => None,
    })
}

fn lenient_entries<'de, D>(deserializer: D) -> Result<Vec<OutputEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Item {
        Entry(OutputEntry),
        Other(IgnoredAny),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Entries {
        List(Vec<Item>),
        Other(IgnoredAny),
    }

    Ok(match Entries::deserialize(deserializer)? {
        Entries::List(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Item::Entry(entry) => Some(entry),
                Item::Other(_) => None,
            })
            .collect(),
        Entries::Other(_) => Vec::new(),
    })
}

/// A scalar as it appears on the wire.  Peers send booleans for button and
/// event channels and integers for axes and deltas, but either may show up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Default for WireValue {
    fn default() -> Self {
        WireValue::Int(0)
    }
}

impl WireValue {
    /// Coerces the wire scalar into a value of `category`.
    ///
    /// Numbers outside the `i16` range become 0 for numeric categories.
    pub fn to_value(self, category: Category) -> Value {
        if category.is_boolean() {
            return Value::Bool(match self {
                WireValue::Bool(b) => b,
                WireValue::Int(v) => v != 0,
                WireValue::Float(v) => v != 0.0,
            });
        }
        Value::Int(match self {
            WireValue::Bool(b) => i16::from(b),
            WireValue::Int(v) => i16::try_from(v).unwrap_or(0),
            WireValue::Float(v) if v >= f64::from(i16::MIN) && v <= f64::from(i16::MAX) => v as i16,
            WireValue::Float(_) => 0,
        })
    }
}

/// Decoded `SET_OUTPUTS` payload: `(category, index, value)` triples in wire
/// order.  Indices are not validated here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputBatch {
    writes: Vec<(Category, i64, Value)>,
}

impl OutputBatch {
    pub fn new(writes: Vec<(Category, i64, Value)>) -> Self {
        Self { writes }
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> impl Iterator<Item = (Category, i64, Value)> + '_ {
        self.writes.iter().copied()
    }
}

impl InboundDocument {
    fn entries(&self, category: Category) -> &[OutputEntry] {
        match category {
            Category::Button => &self.b,
            Category::Axis => &self.a,
            Category::Delta => &self.d,
            Category::Event => &self.e,
        }
    }

    fn output_batch(&self) -> OutputBatch {
        let writes = Category::ALL
            .iter()
            .flat_map(|&category| {
                self.entries(category)
                    .iter()
                    .map(move |entry| (category, entry.index, entry.value.to_value(category)))
            })
            .collect();
        OutputBatch { writes }
    }
}

/// A classified inbound request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    HeartbeatRequest,
    DescriptorListRequest,
    SetOutputs(OutputBatch),
    SubscribeToInputs,
    UnsubscribeFromInputs,
    /// A generic acknowledgement from the peer.
    HeartbeatResponse,
    BindStart,
    BindStop,
    /// Unset `MsgType`, an unknown code, or a kind only the device sends.
    Other(Option<i64>),
}

impl From<&InboundDocument> for Request {
    fn from(doc: &InboundDocument) -> Self {
        let Some(code) = doc.msg_type else {
            return Request::Other(None);
        };
        match MessageKind::try_from(code) {
            Ok(MessageKind::HeartbeatRequest) => Request::HeartbeatRequest,
            Ok(MessageKind::HeartbeatResponse) => Request::HeartbeatResponse,
            Ok(MessageKind::DescriptorListRequest) => Request::DescriptorListRequest,
            Ok(MessageKind::SetOutputs) => Request::SetOutputs(doc.output_batch()),
            Ok(MessageKind::SubscribeToInputs) => Request::SubscribeToInputs,
            Ok(MessageKind::UnsubscribeFromInputs) => Request::UnsubscribeFromInputs,
            Ok(MessageKind::BindStart) => Request::BindStart,
            Ok(MessageKind::BindStop) => Request::BindStop,
            Ok(
                MessageKind::DescriptorListResponse
                | MessageKind::UpdateSubscriber
                | MessageKind::BindResponse,
            )
            | Err(()) => Request::Other(Some(code)),
        }
    }
}

// ── Outbound documents ────────────────────────────────────────────────────────

/// `HEARTBEAT_RESPONSE` used as the generic acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AckDocument {
    pub hostname: String,
    #[serde(rename = "MsgType")]
    pub msg_type: u8,
    pub seq: u32,
}

/// A `{ k: name, v: index }` catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorEntry {
    pub k: String,
    pub v: usize,
}

/// Catalog of one direction keyed by category tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DescriptorTable {
    pub b: Vec<DescriptorEntry>,
    pub a: Vec<DescriptorEntry>,
    pub d: Vec<DescriptorEntry>,
    pub e: Vec<DescriptorEntry>,
}

impl DescriptorTable {
    /// Builds the table from a registry catalog.
    pub fn from_catalog(catalog: Vec<(Category, Vec<Descriptor>)>) -> Self {
        let mut table = Self::default();
        for (category, descriptors) in catalog {
            let entries = descriptors
                .into_iter()
                .map(|d| DescriptorEntry { k: d.name, v: d.index })
                .collect();
            match category {
                Category::Button => table.b = entries,
                Category::Axis => table.a = entries,
                Category::Delta => table.d = entries,
                Category::Event => table.e = entries,
            }
        }
        table
    }
}

/// `DESCRIPTOR_LIST_RESPONSE`: the full channel catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorListDocument {
    pub hostname: String,
    #[serde(rename = "MsgType")]
    pub msg_type: u8,
    /// Preferred push interval in milliseconds.  Peers use it to pace their
    /// own `SET_OUTPUTS` traffic.
    pub rate: u16,
    pub i: DescriptorTable,
    pub o: DescriptorTable,
    pub seq: u32,
}

/// `UPDATE_SUBSCRIBER`: a snapshot of every registered input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriberUpdateDocument {
    pub hostname: String,
    #[serde(rename = "MsgType")]
    pub msg_type: u8,
    pub b: Vec<i16>,
    pub a: Vec<i16>,
    pub d: Vec<i16>,
    pub e: Vec<i16>,
    pub seq: u32,
}

/// `BIND_RESPONSE`: one input changed while bind mode is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindResponseDocument {
    #[serde(rename = "MsgType")]
    pub msg_type: u8,
    pub hostname: String,
    pub index: usize,
    pub category: String,
    pub value: i16,
    pub seq: u32,
}

/// Any document the device sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutboundDocument {
    Ack(AckDocument),
    DescriptorList(DescriptorListDocument),
    SubscriberUpdate(SubscriberUpdateDocument),
    BindResponse(BindResponseDocument),
}

impl OutboundDocument {
    pub fn ack(hostname: &str) -> Self {
        OutboundDocument::Ack(AckDocument {
            hostname: hostname.to_string(),
            msg_type: MessageKind::HeartbeatResponse as u8,
            seq: 0,
        })
    }

    pub fn descriptor_list(
        hostname: &str,
        rate: u16,
        inputs: DescriptorTable,
        outputs: DescriptorTable,
    ) -> Self {
        OutboundDocument::DescriptorList(DescriptorListDocument {
            hostname: hostname.to_string(),
            msg_type: MessageKind::DescriptorListResponse as u8,
            rate,
            i: inputs,
            o: outputs,
            seq: 0,
        })
    }

    pub fn subscriber_update(hostname: &str, snapshot: &InputSnapshot) -> Self {
        OutboundDocument::SubscriberUpdate(SubscriberUpdateDocument {
            hostname: hostname.to_string(),
            msg_type: MessageKind::UpdateSubscriber as u8,
            b: snapshot.get(Category::Button).to_vec(),
            a: snapshot.get(Category::Axis).to_vec(),
            d: snapshot.get(Category::Delta).to_vec(),
            e: snapshot.get(Category::Event).to_vec(),
            seq: 0,
        })
    }

    /// Bind notifications carry the plain value: booleans are *not* inverted.
    pub fn bind_response(hostname: &str, category: Category, index: usize, value: Value) -> Self {
        OutboundDocument::BindResponse(BindResponseDocument {
            msg_type: MessageKind::BindResponse as u8,
            hostname: hostname.to_string(),
            index,
            category: category.tag().to_string(),
            value: value.to_raw(category),
            seq: 0,
        })
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            OutboundDocument::Ack(_) => MessageKind::HeartbeatResponse,
            OutboundDocument::DescriptorList(_) => MessageKind::DescriptorListResponse,
            OutboundDocument::SubscriberUpdate(_) => MessageKind::UpdateSubscriber,
            OutboundDocument::BindResponse(_) => MessageKind::BindResponse,
        }
    }

    pub fn seq(&self) -> u32 {
        match self {
            OutboundDocument::Ack(d) => d.seq,
            OutboundDocument::DescriptorList(d) => d.seq,
            OutboundDocument::SubscriberUpdate(d) => d.seq,
            OutboundDocument::BindResponse(d) => d.seq,
        }
    }

    pub fn set_seq(&mut self, seq: u32) {
        match self {
            OutboundDocument::Ack(d) => d.seq = seq,
            OutboundDocument::DescriptorList(d) => d.seq = seq,
            OutboundDocument::SubscriberUpdate(d) => d.seq = seq,
            OutboundDocument::BindResponse(d) => d.seq = seq,
        }
    }
}
