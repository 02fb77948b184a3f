//! Named presets
//!
//! A preset is a pre-authored sequence of one force type. It is expanded into
//! a `list` directive before queueing, so the resolution engine never sees a
//! `preset` from a well-behaved performer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tempra_core::{Condition, ForceDirective, Mode, Target, TempraError, TempraResult, Trigger};

/// One stored preset
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub name: String,
    #[serde(alias = "force_type", alias = "forcetype")]
    pub force_type: Mode,
    #[serde(alias = "force_sequence", alias = "forcesequence")]
    pub force_sequence: Vec<Target>,
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default, alias = "condition")]
    pub conditions: Option<Condition>,
}

impl Preset {
    /// Expand into `{mode: list, list: [...], trigger, conditions}`
    pub fn to_directive(&self) -> TempraResult<ForceDirective> {
        if !self.force_type.is_list_item() {
            return Err(TempraError::InvalidDirective(format!(
                "preset {:?} has unsupported force type {}",
                self.name, self.force_type
            )));
        }
        let items = self
            .force_sequence
            .iter()
            .map(|target| ForceDirective {
                mode: self.force_type,
                target: Some(target.clone()),
                trigger: Trigger::Egal,
                condition: None,
                list: Vec::new(),
                name: None,
            })
            .collect();

        let mut directive = ForceDirective::list(items).with_trigger(self.trigger);
        directive.condition = self.conditions;
        directive.validate()?;
        Ok(directive)
    }
}

/// Presets by name
#[derive(Clone, Debug, Default)]
pub struct PresetBook {
    presets: HashMap<String, Preset>,
}

impl PresetBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a preset
    pub fn insert(&mut self, preset: Preset) -> TempraResult<()> {
        preset.to_directive()?;
        self.presets.insert(preset.name.clone(), preset);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Replace a `preset` directive by its expansion
    ///
    /// Other directives pass through. A trigger or condition given on the
    /// pushed directive overrides the preset's own.
    pub fn expand(&self, directive: ForceDirective) -> TempraResult<ForceDirective> {
        if directive.mode != Mode::Preset {
            return Ok(directive);
        }
        let name = directive
            .name
            .as_deref()
            .ok_or_else(|| TempraError::InvalidDirective("preset requires a name".to_string()))?;
        let preset = self
            .get(name)
            .ok_or_else(|| TempraError::InvalidDirective(format!("unknown preset {:?}", name)))?;

        let mut expanded = preset.to_directive()?;
        if directive.trigger != Trigger::Egal {
            expanded.trigger = directive.trigger;
        }
        if directive.condition.is_some() {
            expanded.condition = directive.condition;
        }
        Ok(expanded)
    }
}

impl TryFrom<Vec<Preset>> for PresetBook {
    type Error = TempraError;

    fn try_from(presets: Vec<Preset>) -> Result<Self, Self::Error> {
        let mut book = PresetBook::new();
        for preset in presets {
            book.insert(preset)?;
        }
        Ok(book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempra_core::ConditionKind;

    fn opener() -> Preset {
        serde_json::from_value(json!({
            "name": "opener",
            "forceType": "ms",
            "forceSequence": [12, "34"],
            "trigger": "lap",
            "conditions": {"type": "stops", "value": 2}
        }))
        .unwrap()
    }

    #[test]
    fn test_preset_expands_to_list() {
        let directive = opener().to_directive().unwrap();
        assert_eq!(directive.mode, Mode::List);
        assert_eq!(directive.trigger, Trigger::Lap);
        assert_eq!(directive.condition, Some(Condition::new(ConditionKind::Stops, 2)));
        assert_eq!(directive.list.len(), 2);
        assert_eq!(directive.list[1].target, Some(Target::Text("34".into())));
    }

    #[test]
    fn test_book_expand() {
        let book = PresetBook::try_from(vec![opener()]).unwrap();
        let expanded = book
            .expand(ForceDirective::preset("opener").with_trigger(Trigger::Stop))
            .unwrap();
        assert_eq!(expanded.mode, Mode::List);
        assert_eq!(expanded.trigger, Trigger::Stop);

        let passthrough = book.expand(ForceDirective::ms(3)).unwrap();
        assert_eq!(passthrough, ForceDirective::ms(3));

        assert!(matches!(
            book.expand(ForceDirective::preset("missing")),
            Err(TempraError::InvalidDirective(_))
        ));
    }

    #[test]
    fn test_bad_presets_rejected() {
        let mut bad = opener();
        bad.force_type = Mode::Control;
        assert!(PresetBook::new().insert(bad).is_err());

        let mut empty = opener();
        empty.force_sequence.clear();
        assert!(PresetBook::new().insert(empty).is_err());

        let mut out_of_range = opener();
        out_of_range.force_sequence = vec![Target::Number(120)];
        assert!(PresetBook::new().insert(out_of_range).is_err());
    }
}
