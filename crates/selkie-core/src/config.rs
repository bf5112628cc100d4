use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// JSON-shaped configuration with dotted-path access (`"flowchart.nodeSpacing"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config(Value);

impl Default for Config {
    fn default() -> Self {
        Self::empty_object()
    }
}

impl Config {
    pub fn empty_object() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// Built-in defaults for every key the pipeline reads.
    pub fn defaults() -> Self {
        let graph_spacing = json!({
            "nodeSpacing": 50.0,
            "rankSpacing": 50.0,
            "padding": 15.0,
            "diagramPadding": 8.0,
        });
        Self(json!({
            "fontSize": 16.0,
            "maxTextSize": crate::limits::DEFAULT_MAX_TEXT_SIZE,
            "maxTokens": crate::limits::DEFAULT_MAX_TOKENS,
            "maxNodes": crate::limits::DEFAULT_MAX_NODES,
            "maxEdges": crate::limits::DEFAULT_MAX_EDGES,
            "maxLayoutItems": crate::limits::DEFAULT_MAX_LAYOUT_ITEMS,
            "flowchart": graph_spacing.clone(),
            "class": graph_spacing.clone(),
            "state": graph_spacing.clone(),
            "er": graph_spacing,
            "sequence": {
                "actorMargin": 50.0,
                "width": 150.0,
                "height": 65.0,
                "boxMargin": 10.0,
                "noteMargin": 10.0,
                "messageMargin": 35.0,
                "activationWidth": 10.0,
                "diagramMarginX": 50.0,
                "diagramMarginY": 10.0,
            },
            "gantt": {
                "barHeight": 20.0,
                "barGap": 4.0,
                "topPadding": 50.0,
                "leftPadding": 75.0,
                "rightPadding": 75.0,
                "gridLineStartPadding": 35.0,
                "numberSectionStyles": 4,
                "width": 1200.0,
            },
            "pie": {
                "radius": 185.0,
                "textPosition": 0.75,
                "legendSpacing": 22.0,
            },
            "journey": {
                "taskWidth": 150.0,
                "taskHeight": 50.0,
                "taskMargin": 50.0,
                "diagramMarginX": 50.0,
                "diagramMarginY": 10.0,
            },
            "gitGraph": {
                "commitSpacing": 50.0,
                "branchSpacing": 90.0,
                "commitRadius": 10.0,
                "showBranches": true,
            },
            "mindmap": {
                "levelSpacing": 80.0,
                "nodeSpacing": 20.0,
                "padding": 10.0,
            },
            "timeline": {
                "periodWidth": 150.0,
                "eventHeight": 40.0,
                "sectionSpacing": 20.0,
                "padding": 10.0,
            },
        }))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn as_value_mut(&mut self) -> &mut Value {
        &mut self.0
    }

    pub fn get(&self, dotted_path: &str) -> Option<&Value> {
        let mut cur = &self.0;
        for segment in dotted_path.split('.') {
            cur = cur.as_object()?.get(segment)?;
        }
        Some(cur)
    }

    pub fn get_str(&self, dotted_path: &str) -> Option<&str> {
        self.get(dotted_path)?.as_str()
    }

    pub fn get_bool(&self, dotted_path: &str) -> Option<bool> {
        self.get(dotted_path)?.as_bool()
    }

    /// Numeric lookup; numeric strings (`"40"`) are accepted as well.
    pub fn get_f64(&self, dotted_path: &str) -> Option<f64> {
        match self.get(dotted_path)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|v| v.is_finite())
    }

    pub fn get_usize(&self, dotted_path: &str) -> Option<usize> {
        let v = self.get_f64(dotted_path)?;
        (v >= 0.0).then_some(v as usize)
    }

    pub fn set_value(&mut self, dotted_path: &str, value: Value) {
        // Configs built with `from_value` may hold a non-object root.
        if !self.0.is_object() {
            self.0 = Value::Object(Map::new());
        }

        let Value::Object(ref mut root) = self.0 else {
            return;
        };
        let mut cur: &mut Map<String, Value> = root;
        let mut segments = dotted_path.split('.').peekable();
        while let Some(seg) = segments.next() {
            if segments.peek().is_none() {
                cur.insert(seg.to_string(), value);
                return;
            }
            let slot = cur.entry(seg).or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Some(next) = slot.as_object_mut() else {
                return;
            };
            cur = next;
        }
    }

    pub fn deep_merge(&mut self, other: &Value) {
        deep_merge_value(&mut self.0, other);
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}
