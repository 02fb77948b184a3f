//! Force directives and queue entries
//!
//! A directive is authored by the performer and travels to the spectator
//! display as JSON. Decoding only checks that the directive is well formed;
//! payload ranges are checked by [`ForceDirective::validate`] at enqueue time
//! and again by the resolution engine, which must stay total over any input.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EntryId, TempraError, TempraResult};

/// Directive mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Set centiseconds (0-99)
    Ms,
    /// Set seconds and centiseconds from a 4-digit `SSCC` string
    Ft,
    /// Force the digit sum of the displayed time
    S,
    /// Ordered sub-directives, one consumed per qualifying event
    List,
    /// Remote start/stop/lap/reset
    Control,
    /// Named, pre-authored sequence
    Preset,
}

impl Mode {
    /// Parse a mode name (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ms" => Some(Mode::Ms),
            "ft" => Some(Mode::Ft),
            "s" => Some(Mode::S),
            "list" => Some(Mode::List),
            "control" => Some(Mode::Control),
            "preset" => Some(Mode::Preset),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Ms => "ms",
            Mode::Ft => "ft",
            Mode::S => "s",
            Mode::List => "list",
            Mode::Control => "control",
            Mode::Preset => "preset",
        }
    }

    /// Modes that rewrite elapsed time on a stop/lap event
    pub fn is_time_force(self) -> bool {
        matches!(self, Mode::Ms | Mode::Ft | Mode::S | Mode::List)
    }

    /// Modes that may appear inside a `list`
    pub fn is_list_item(self) -> bool {
        matches!(self, Mode::Ms | Mode::Ft | Mode::S)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-visible timer event that can fire a directive
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerEvent {
    Stop,
    Lap,
}

impl TimerEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerEvent::Stop => "stop",
            TimerEvent::Lap => "lap",
        }
    }
}

/// Class of event eligible to fire a directive
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Stop,
    Lap,
    /// Either event
    #[default]
    #[serde(alias = "either")]
    Egal,
}

impl Trigger {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "stop" => Some(Trigger::Stop),
            "lap" => Some(Trigger::Lap),
            "egal" | "either" | "" => Some(Trigger::Egal),
            _ => None,
        }
    }

    #[inline]
    pub fn accepts(self, event: TimerEvent) -> bool {
        match self {
            Trigger::Egal => true,
            Trigger::Stop => event == TimerEvent::Stop,
            Trigger::Lap => event == TimerEvent::Lap,
        }
    }
}

/// What a condition compares against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    /// Whole elapsed seconds
    Seconds,
    /// Stop presses
    Stops,
    /// Lap presses
    Laps,
    /// Reset presses
    Resets,
}

/// Additional eligibility gate, independent of the trigger
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    pub value: u64,
}

impl Condition {
    pub fn new(kind: ConditionKind, value: u64) -> Self {
        Condition { kind, value }
    }
}

/// Mode-specific payload: a number or a digit string
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    Number(i64),
    Text(String),
}

impl Target {
    /// Integer view; numeric strings are accepted
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Target::Number(n) => Some(*n),
            Target::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Text view; numbers are rendered in decimal
    pub fn as_text(&self) -> String {
        match self {
            Target::Number(n) => n.to_string(),
            Target::Text(s) => s.trim().to_string(),
        }
    }
}

impl From<i64> for Target {
    fn from(value: i64) -> Self {
        Target::Number(value)
    }
}

impl From<&str> for Target {
    fn from(value: &str) -> Self {
        Target::Text(value.to_string())
    }
}

/// Remote timer action carried by a `control` directive
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlAction {
    Start,
    Resume,
    Stop,
    Lap,
    Reset,
    ClearCounters,
}

impl ControlAction {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "start" => Some(ControlAction::Start),
            "resume" => Some(ControlAction::Resume),
            "stop" => Some(ControlAction::Stop),
            "lap" => Some(ControlAction::Lap),
            "reset" => Some(ControlAction::Reset),
            "clear-counters" | "clear_counters" => Some(ControlAction::ClearCounters),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ControlAction::Start => "start",
            ControlAction::Resume => "resume",
            ControlAction::Stop => "stop",
            ControlAction::Lap => "lap",
            ControlAction::Reset => "reset",
            ControlAction::ClearCounters => "clear-counters",
        }
    }
}

/// One covert rewrite (or remote action) authored by the performer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireDirective")]
pub struct ForceDirective {
    pub mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    pub trigger: Trigger,
    #[serde(rename = "conditions", skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub list: Vec<ForceDirective>,
    /// Preset name, for `preset` directives
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ForceDirective {
    fn with_mode(mode: Mode, target: Option<Target>) -> Self {
        ForceDirective {
            mode,
            target,
            trigger: Trigger::Egal,
            condition: None,
            list: Vec::new(),
            name: None,
        }
    }

    /// `ms` force: set centiseconds
    pub fn ms(centis: i64) -> Self {
        Self::with_mode(Mode::Ms, Some(Target::Number(centis)))
    }

    /// `ft` force: set seconds and centiseconds from `SSCC`
    pub fn ft(sscc: &str) -> Self {
        Self::with_mode(Mode::Ft, Some(Target::Text(sscc.to_string())))
    }

    /// `s` force: set digit sum
    pub fn digit_sum(sum: i64) -> Self {
        Self::with_mode(Mode::S, Some(Target::Number(sum)))
    }

    pub fn list(items: Vec<ForceDirective>) -> Self {
        let mut directive = Self::with_mode(Mode::List, None);
        directive.list = items;
        directive
    }

    pub fn control(action: ControlAction) -> Self {
        Self::with_mode(Mode::Control, Some(Target::Text(action.as_str().to_string())))
    }

    pub fn preset(name: impl Into<String>) -> Self {
        let mut directive = Self::with_mode(Mode::Preset, None);
        directive.name = Some(name.into());
        directive
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Control action, if this is a well-formed `control` directive
    pub fn control_action(&self) -> Option<ControlAction> {
        if self.mode != Mode::Control {
            return None;
        }
        self.target
            .as_ref()
            .and_then(|t| ControlAction::parse(&t.as_text()))
    }

    /// Check the payload against its mode
    ///
    /// Called at enqueue time so a malformed force never reaches the head of
    /// a queue where it would block everything behind it.
    pub fn validate(&self) -> TempraResult<()> {
        let invalid = |msg: String| Err(TempraError::InvalidDirective(msg));
        match self.mode {
            Mode::Ms => match self.integer_target() {
                Some(t) if (0..=99).contains(&t) => Ok(()),
                _ => invalid(format!("ms target must be 0-99, got {:?}", self.target)),
            },
            Mode::Ft => {
                let text = self.target.as_ref().map(Target::as_text).unwrap_or_default();
                match split_sscc(&text) {
                    Some((ss, cs)) if ss < 60 && cs < 100 => Ok(()),
                    _ => invalid(format!("ft target must be SSCC with SS<60, got {:?}", text)),
                }
            }
            Mode::S => match self.integer_target() {
                Some(t) if t >= 0 => Ok(()),
                _ => invalid(format!(
                    "s target must be a non-negative integer, got {:?}",
                    self.target
                )),
            },
            Mode::List => {
                if self.list.is_empty() {
                    return invalid("list must not be empty".to_string());
                }
                for item in &self.list {
                    if !item.mode.is_list_item() {
                        return invalid(format!("{} cannot appear inside a list", item.mode));
                    }
                    item.validate()?;
                }
                Ok(())
            }
            Mode::Control => match self.control_action() {
                Some(_) => Ok(()),
                None => invalid(format!("unknown control action {:?}", self.target)),
            },
            Mode::Preset => match self.name.as_deref() {
                Some(name) if !name.trim().is_empty() => Ok(()),
                _ => invalid("preset requires a name".to_string()),
            },
        }
    }

    /// Decode a PUSH body: either `{force: {...}}` or a bare directive
    pub fn from_push_body(body: serde_json::Value) -> TempraResult<Self> {
        let inner = match body {
            serde_json::Value::Object(mut map) if map.contains_key("force") => {
                map.remove("force").unwrap_or(serde_json::Value::Null)
            }
            other => other,
        };
        serde_json::from_value(inner).map_err(|e| TempraError::InvalidDirective(e.to_string()))
    }

    fn integer_target(&self) -> Option<i64> {
        self.target.as_ref().and_then(Target::as_integer)
    }
}

/// Split a 4-digit `SSCC` string into seconds and centiseconds
pub fn split_sscc(text: &str) -> Option<(u64, u64)> {
    if text.len() != 4 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let ss = text[0..2].parse().ok()?;
    let cs = text[2..4].parse().ok()?;
    Some((ss, cs))
}

/// Lenient wire shape accepted from performers
#[derive(Deserialize)]
struct WireDirective {
    #[serde(default, alias = "force_type")]
    mode: Option<String>,
    #[serde(default, alias = "value")]
    target: Option<Target>,
    #[serde(default)]
    trigger: Option<String>,
    #[serde(default, alias = "condition")]
    conditions: Option<Condition>,
    #[serde(default)]
    list: Option<Vec<ForceDirective>>,
    #[serde(default, alias = "preset_name")]
    name: Option<String>,
}

impl TryFrom<WireDirective> for ForceDirective {
    type Error = TempraError;

    fn try_from(wire: WireDirective) -> Result<Self, Self::Error> {
        let raw_mode = wire
            .mode
            .ok_or_else(|| TempraError::InvalidDirective("missing mode".to_string()))?;
        let mode = Mode::parse(&raw_mode)
            .ok_or_else(|| TempraError::InvalidDirective(format!("unknown mode {:?}", raw_mode)))?;
        let trigger = match wire.trigger.as_deref() {
            None => Trigger::Egal,
            Some(raw) => Trigger::parse(raw).ok_or_else(|| {
                TempraError::InvalidDirective(format!("unknown trigger {:?}", raw))
            })?,
        };

        Ok(ForceDirective {
            mode,
            target: wire.target,
            trigger,
            condition: wire.conditions,
            list: wire.list.unwrap_or_default(),
            name: wire.name,
        })
    }
}

/// One pending directive in a token's queue
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,
    #[serde(rename = "force")]
    pub directive: ForceDirective,
    #[serde(rename = "createdAt", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub processed: bool,
}

impl QueueEntry {
    pub fn new(id: EntryId, directive: ForceDirective, created_at: DateTime<Utc>) -> Self {
        QueueEntry {
            id,
            directive,
            created_at,
            processed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_defaults_trigger_to_egal() {
        let d: ForceDirective =
            serde_json::from_value(json!({"mode": "ms", "target": 15})).unwrap();
        assert_eq!(d.mode, Mode::Ms);
        assert_eq!(d.trigger, Trigger::Egal);
        assert_eq!(d.target, Some(Target::Number(15)));
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_decode_rejects_missing_or_unknown_mode() {
        let missing = serde_json::from_value::<ForceDirective>(json!({"target": 15}));
        assert!(missing.is_err());

        let unknown = ForceDirective::from_push_body(json!({"mode": "warp", "target": 1}));
        assert!(matches!(unknown, Err(TempraError::InvalidDirective(_))));
    }

    #[test]
    fn test_decode_aliases() {
        let d: ForceDirective = serde_json::from_value(json!({
            "force_type": "FT",
            "value": "2443",
            "trigger": "lap",
            "condition": {"type": "stops", "value": 2}
        }))
        .unwrap();
        assert_eq!(d.mode, Mode::Ft);
        assert_eq!(d.target, Some(Target::Text("2443".into())));
        assert_eq!(d.trigger, Trigger::Lap);
        assert_eq!(d.condition, Some(Condition::new(ConditionKind::Stops, 2)));
    }

    #[test]
    fn test_push_body_shapes() {
        let wrapped =
            ForceDirective::from_push_body(json!({"force": {"mode": "s", "target": 20}})).unwrap();
        let flat =
            ForceDirective::from_push_body(json!({"mode": "s", "target": 20, "app": "tempra"}))
                .unwrap();
        assert_eq!(wrapped, flat);
    }

    #[test]
    fn test_nested_list_decodes() {
        let d = ForceDirective::from_push_body(json!({
            "mode": "list",
            "trigger": "lap",
            "list": [{"mode": "ms", "target": 1}, {"mode": "ms", "target": 2}]
        }))
        .unwrap();
        assert_eq!(d.list.len(), 2);
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_validate_payloads() {
        assert!(ForceDirective::ms(100).validate().is_err());
        assert!(ForceDirective::ms(-1).validate().is_err());
        assert!(ForceDirective::ft("6000").validate().is_err());
        assert!(ForceDirective::ft("243").validate().is_err());
        assert!(ForceDirective::ft("5999").validate().is_ok());
        assert!(ForceDirective::digit_sum(-3).validate().is_err());
        assert!(ForceDirective::list(vec![]).validate().is_err());
        assert!(ForceDirective::list(vec![ForceDirective::control(ControlAction::Stop)])
            .validate()
            .is_err());
        assert!(ForceDirective::preset("  ").validate().is_err());
        assert!(ForceDirective::control(ControlAction::ClearCounters).validate().is_ok());
    }

    #[test]
    fn test_queue_entry_wire_shape() {
        let created = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let entry = QueueEntry::new(EntryId::new("abc"), ForceDirective::ms(15), created);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["id"], "abc");
        assert_eq!(value["createdAt"], 1_700_000_000_123i64);
        assert_eq!(value["force"]["mode"], "ms");
        assert_eq!(value["force"]["trigger"], "egal");
        assert_eq!(value["processed"], false);

        let back: QueueEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_split_sscc() {
        assert_eq!(split_sscc("2443"), Some((24, 43)));
        assert_eq!(split_sscc("24a3"), None);
        assert_eq!(split_sscc("24433"), None);
    }
}
