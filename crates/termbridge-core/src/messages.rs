//! Viewer wire protocol.
//!
//! Every frame is a JSON object tagged by its `type` field.
//!
//! - viewer → bridge: `{"type":"input","data":..}`, `{"type":"resize","cols":..,"rows":..}`
//! - bridge → viewer: `{"type":"output","data":..,"append":..}`

use serde::{Deserialize, Serialize};

/// Terminal size assumed when a resize frame omits a dimension.
pub const DEFAULT_COLS: u16 = 80;
pub const DEFAULT_ROWS: u16 = 24;

/// Messages sent by a viewer to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ViewerMessage {
    /// Free-form typed input, injected without key-name interpretation.
    Input {
        #[serde(default)]
        data: String,
    },
    /// Viewer terminal geometry changed.
    Resize {
        #[serde(default = "default_cols")]
        cols: u16,
        #[serde(default = "default_rows")]
        rows: u16,
    },
}

fn default_cols() -> u16 {
    DEFAULT_COLS
}

fn default_rows() -> u16 {
    DEFAULT_ROWS
}

/// Messages sent by the bridge to a viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BridgeMessage {
    /// Terminal output.
    ///
    /// `append == false` replaces everything the viewer is showing;
    /// `append == true` is an incremental chunk to add to it.
    Output {
        data: String,
        #[serde(default)]
        append: bool,
    },
}

impl BridgeMessage {
    /// A full-replace output frame.
    pub fn snapshot(data: impl Into<String>) -> Self {
        BridgeMessage::Output {
            data: data.into(),
            append: false,
        }
    }

    /// An incremental output frame.
    pub fn chunk(data: impl Into<String>) -> Self {
        BridgeMessage::Output {
            data: data.into(),
            append: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_input() {
        let msg: ViewerMessage = serde_json::from_str(r#"{"type":"input","data":"ls\n"}"#).unwrap();
        assert_eq!(
            msg,
            ViewerMessage::Input {
                data: "ls\n".into()
            }
        );
    }

    #[test]
    fn resize_defaults_missing_dimensions() {
        let msg: ViewerMessage = serde_json::from_str(r#"{"type":"resize","cols":120}"#).unwrap();
        assert_eq!(msg, ViewerMessage::Resize { cols: 120, rows: 24 });
    }

    #[test]
    fn rejects_unknown_type() {
        let res = serde_json::from_str::<ViewerMessage>(r#"{"type":"ping"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn rejects_negative_dimensions() {
        let res = serde_json::from_str::<ViewerMessage>(r#"{"type":"resize","cols":-1,"rows":10}"#);
        assert!(res.is_err());
    }

    #[test]
    fn output_shape() {
        let json = serde_json::to_value(BridgeMessage::snapshot("hello")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "output", "data": "hello", "append": false})
        );

        let json = serde_json::to_value(BridgeMessage::chunk("x")).unwrap();
        assert_eq!(json["append"], serde_json::json!(true));
    }
}
