#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use trestle_bridge::{Bridge, BridgeRt, DefaultTranslator, LivenessTable};
use trestle_engine::{EngineError, EngineValue, Evaluator, Heap, Origin, Props};
use trestle_host::{ManualClock, RunLoop};

/// Stand-in evaluator: "source" is a JSON document, evaluated to the
/// corresponding engine value. Enough surface to exercise the boundary
/// without a real compiler.
pub struct JsonEvaluator;

impl Evaluator for JsonEvaluator {
    fn eval(
        &mut self,
        heap: &mut Heap,
        _globals: &EngineValue,
        source: &str,
        origin: &Origin,
    ) -> Result<EngineValue, EngineError> {
        let parsed: serde_json::Value =
            serde_json::from_str(source).map_err(|err| EngineError::Eval {
                message: err.to_string(),
                file: origin.file.clone(),
                line: origin.line,
            })?;
        Ok(json_to_engine(heap, &parsed))
    }
}

fn json_to_engine(heap: &mut Heap, v: &serde_json::Value) -> EngineValue {
    match v {
        serde_json::Value::Null => EngineValue::Null,
        serde_json::Value::Bool(b) => EngineValue::Bool(*b),
        serde_json::Value::Number(n) => EngineValue::Num(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => EngineValue::str(s),
        serde_json::Value::Array(items) => {
            let converted = items.iter().map(|i| json_to_engine(heap, i)).collect();
            heap.new_array(converted)
        }
        serde_json::Value::Object(entries) => {
            let mut props = Props::default();
            for (key, item) in entries {
                let value = json_to_engine(heap, item);
                props.insert(Rc::from(key.as_str()), value);
            }
            heap.new_object(props)
        }
    }
}

pub fn bridge_with_manual_clock() -> (Bridge, Rc<ManualClock>) {
    let clock = Rc::new(ManualClock::new());
    let bridge = Bridge::with_clock(Box::new(JsonEvaluator), clock.clone())
        .expect("context initialization");
    (bridge, clock)
}

pub fn new_bridge() -> Bridge {
    bridge_with_manual_clock().0
}

/// Bare runtime state for tests that drive the factory directly.
pub fn new_rt() -> BridgeRt {
    BridgeRt {
        heap: Rc::new(RefCell::new(Heap::new())),
        liveness: Rc::new(RefCell::new(LivenessTable::new())),
        run_loop: Rc::new(RefCell::new(RunLoop::new(Rc::new(ManualClock::new())))),
        translator: Rc::new(DefaultTranslator),
    }
}
