//! Settings documents exchanged with the servo: the descriptor reported by
//! `query` and the desired state read by `adjust`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ResourceBounds;

/// The only component this driver manages.
pub const CANARY_COMPONENT: &str = "canary";

pub const CPU_SETTING: &str = "cpu";
pub const MEM_SETTING: &str = "mem";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKind {
    Range,
}

/// One tunable resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    #[serde(rename = "type")]
    pub kind: SettingKind,
    pub unit: String,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    /// `None` serializes as `null`: neither the optimizer nor the config
    /// supplied a current value.
    pub value: Option<f64>,
}

impl Setting {
    /// A range setting from already defaulted bounds. `value` wins over the
    /// configured default.
    pub fn range(unit: &str, bounds: &ResourceBounds, value: Option<f64>) -> Self {
        Self {
            kind: SettingKind::Range,
            unit: unit.to_string(),
            min: bounds.min.unwrap_or_default(),
            max: bounds.max.unwrap_or_default(),
            step: bounds.step.unwrap_or_default(),
            value: value.or(bounds.default),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSettings {
    pub settings: BTreeMap<String, Setting>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSettings {
    pub components: BTreeMap<String, ComponentSettings>,
}

/// Output of `query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsDescriptor {
    pub application: ApplicationSettings,
}

impl SettingsDescriptor {
    /// Wrap cpu/mem settings in the fixed canary component envelope.
    pub fn canary(cpu: Setting, mem: Setting) -> Self {
        let settings = BTreeMap::from([
            (CPU_SETTING.to_string(), cpu),
            (MEM_SETTING.to_string(), mem),
        ]);
        let components = BTreeMap::from([(
            CANARY_COMPONENT.to_string(),
            ComponentSettings { settings },
        )]);
        Self {
            application: ApplicationSettings { components },
        }
    }

    pub fn setting(&self, component: &str, name: &str) -> Option<&Setting> {
        self.application
            .components
            .get(component)
            .and_then(|c| c.settings.get(name))
    }
}

/// Desired value of one setting. Values are kept as raw JSON so they are
/// forwarded to the workflow exactly as the servo wrote them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DesiredSetting {
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DesiredComponent {
    #[serde(default)]
    pub settings: Option<BTreeMap<String, DesiredSetting>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DesiredApplication {
    pub components: BTreeMap<String, DesiredComponent>,
}

/// Input of `adjust`, read from stdin.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DesiredState {
    pub application: DesiredApplication,
}

impl DesiredState {
    /// Settings requested for the canary component. `None` when the
    /// component is absent or carries no settings.
    pub fn canary_settings(&self) -> Option<&BTreeMap<String, DesiredSetting>> {
        self.application
            .components
            .get(CANARY_COMPONENT)
            .and_then(|c| c.settings.as_ref())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn setting_serializes_with_type_tag() {
        let setting = Setting::range("cores", &ResourceBounds::cpu(), Some(0.5));
        let value = serde_json::to_value(&setting).unwrap();
        assert_eq!(
            value,
            json!({"type": "range", "unit": "cores", "min": 0.125, "max": 4.0, "step": 0.125, "value": 0.5})
        );
    }

    #[test]
    fn setting_value_falls_back_to_default() {
        let bounds = ResourceBounds {
            default: Some(1.0),
            ..ResourceBounds::mem()
        };
        let setting = Setting::range("GiB", &bounds, None);
        assert_eq!(setting.value, Some(1.0));

        let setting = Setting::range("GiB", &ResourceBounds::mem(), None);
        assert_eq!(setting.value, None);
        assert_eq!(serde_json::to_value(&setting).unwrap()["value"], json!(null));
    }

    #[test]
    fn descriptor_envelope_shape() {
        let cpu = Setting::range("cores", &ResourceBounds::cpu(), Some(1.0));
        let mem = Setting::range("GiB", &ResourceBounds::mem(), Some(2.0));
        let descriptor = SettingsDescriptor::canary(cpu, mem);

        let value = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(value["application"]["components"]["canary"]["settings"]["cpu"]["value"], json!(1.0));
        assert_eq!(value["application"]["components"]["canary"]["settings"]["mem"]["unit"], json!("GiB"));
        assert_eq!(descriptor.setting("canary", "mem").unwrap().value, Some(2.0));
    }

    #[test]
    fn desired_state_canary_settings() {
        let desired: DesiredState = serde_json::from_value(json!({
            "application": {"components": {"canary": {"settings": {
                "cpu": {"value": 0.5},
                "mem": {"value": 1}
            }}}}
        }))
        .unwrap();
        let settings = desired.canary_settings().unwrap();
        assert_eq!(settings["cpu"].value, Some(json!(0.5)));
        assert_eq!(settings["mem"].value, Some(json!(1)));
    }

    #[test]
    fn desired_state_without_canary() {
        let desired: DesiredState = serde_json::from_value(json!({
            "application": {"components": {"main": {"settings": {"cpu": {"value": 1}}}}}
        }))
        .unwrap();
        assert!(desired.canary_settings().is_none());

        let desired: DesiredState = serde_json::from_value(json!({
            "application": {"components": {"canary": {"settings": {}}}}
        }))
        .unwrap();
        assert!(desired.canary_settings().is_none());
    }
}
