//! The type factory: bidirectional value conversion between the host and
//! engine runtimes.
//!
//! Conversion strategy is decided purely from the source value's reported
//! kind. Scalars convert by value; host containers cross lazily behind a
//! [`ContainerProxy`](crate::proxy::ContainerProxy) while engine containers
//! materialize eagerly into native host containers (the host has no proxy
//! facility; the asymmetry is deliberate). Callables cross behind thin
//! trampolines that marshal arguments and results recursively through the
//! factory.

use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use trestle_engine::{EngineError, EngineValue, GcObject, Heap, ObjectId, MAX_SAFE_INTEGER};
use trestle_host::{FuncRef, HostError, HostIterate, HostValue, IterRef, ListRef, MapRef, MapStorage};

use crate::context::BridgeRt;
use crate::proxy::ContainerProxy;

/// Convert a host value into its engine equivalent. Total over every host
/// kind; failures originate only from the host side (container faults).
pub fn to_engine(rt: &BridgeRt, heap: &mut Heap, value: &HostValue) -> Result<EngineValue, EngineError> {
    match value {
        HostValue::Null => Ok(EngineValue::Null),
        HostValue::Bool(b) => Ok(EngineValue::Bool(*b)),
        HostValue::Int(i) => {
            // Ints beyond the engine's exact-number range keep full
            // precision as engine big-ints instead of truncating.
            if i.unsigned_abs() <= MAX_SAFE_INTEGER as u64 {
                Ok(EngineValue::Num(*i as f64))
            } else {
                Ok(EngineValue::big(BigInt::from(*i)))
            }
        }
        HostValue::Big(b) => Ok(EngineValue::Big(Rc::clone(b))),
        HostValue::Float(x) => Ok(EngineValue::Num(*x)),
        HostValue::Str(s) => Ok(EngineValue::Str(Rc::clone(s))),
        HostValue::Date(ms) => Ok(heap.new_date(*ms)),
        HostValue::List(list) => {
            let proxy = ContainerProxy::for_list(rt, list);
            Ok(heap.new_proxy(Rc::new(proxy)))
        }
        HostValue::Map(map) => {
            let proxy = ContainerProxy::for_map(rt, map);
            Ok(heap.new_proxy(Rc::new(proxy)))
        }
        HostValue::Func(func) => Ok(host_fn_trampoline(rt, heap, func)),
        HostValue::Iter(iter) => Ok(wrap_host_iter(rt, heap, IterRef::adopt(iter))),
    }
}

/// Convert an engine value into its host equivalent. Engine containers are
/// materialized eagerly; if any element conversion fails the whole
/// conversion fails and no partial result escapes.
pub fn to_host(rt: &BridgeRt, heap: &mut Heap, value: &EngineValue) -> Result<HostValue, EngineError> {
    match value {
        EngineValue::Undefined | EngineValue::Null => Ok(HostValue::Null),
        EngineValue::Bool(b) => Ok(HostValue::Bool(*b)),
        EngineValue::Num(n) => Ok(HostValue::Float(*n)),
        EngineValue::Big(b) => Ok(match b.to_i64() {
            Some(i) => HostValue::Int(i),
            None => HostValue::Big(Rc::clone(b)),
        }),
        EngineValue::Str(s) => Ok(HostValue::Str(Rc::clone(s))),
        EngineValue::Obj(id) => obj_to_host(rt, heap, value, *id),
    }
}

fn obj_to_host(
    rt: &BridgeRt,
    heap: &mut Heap,
    value: &EngineValue,
    id: ObjectId,
) -> Result<HostValue, EngineError> {
    enum Path {
        Date(i64),
        Array(Vec<EngineValue>),
        Object(Vec<(Rc<str>, EngineValue)>),
        Alias(HostValue),
        ForeignProxy(Rc<dyn trestle_engine::ProxyHandler>),
        Callable(Rc<str>),
        Iterator,
    }

    // Snapshot children first so element conversion below may allocate.
    let path = match heap.get(id) {
        GcObject::Date(ms) => Path::Date(*ms),
        GcObject::Array(items) => Path::Array(items.clone()),
        GcObject::Object(props) => {
            Path::Object(props.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        }
        GcObject::Proxy(handler) => {
            // A proxied host container crossing back: hand out the original
            // container, not a copy.
            match handler
                .as_any()
                .downcast_ref::<ContainerProxy>()
                .and_then(|p| p.backing_host_value())
            {
                Some(host) => Path::Alias(host),
                None => Path::ForeignProxy(Rc::clone(handler)),
            }
        }
        GcObject::Function(f) => Path::Callable(Rc::clone(&f.name)),
        GcObject::Bound { .. } => Path::Callable(Rc::from("bound")),
        GcObject::Iterator(_) => Path::Iterator,
    };

    match path {
        Path::Date(ms) => Ok(HostValue::Date(ms)),
        Path::Alias(host) => Ok(host),
        Path::Array(items) => {
            let mut converted = Vec::with_capacity(items.len());
            for item in &items {
                converted.push(to_host(rt, heap, item)?);
            }
            Ok(HostValue::List(ListRef::new(converted)))
        }
        Path::Object(entries) => {
            let mut storage = MapStorage::default();
            for (key, item) in &entries {
                storage.insert(key.clone(), to_host(rt, heap, item)?);
            }
            Ok(HostValue::Map(MapRef::new(storage)))
        }
        Path::ForeignProxy(handler) => {
            // No backing host container to alias; materialize through the
            // handler's own traps.
            let keys = handler.own_keys()?;
            let mut storage = MapStorage::default();
            for key in keys {
                let child = handler.get(heap, &key)?;
                storage.insert(Rc::from(key.to_string().as_str()), to_host(rt, heap, &child)?);
            }
            Ok(HostValue::Map(MapRef::new(storage)))
        }
        Path::Callable(name) => engine_fn_trampoline(rt, heap, value, &name),
        Path::Iterator => engine_iter_to_host(rt, heap, value),
    }
}

// ----------------------------------------------------------------------
// Callable trampolines
// ----------------------------------------------------------------------

/// Wrap a host callable as an engine function that marshals arguments and
/// the result (or failure) back through the factory.
fn host_fn_trampoline(rt: &BridgeRt, heap: &mut Heap, func: &FuncRef) -> EngineValue {
    let rt = rt.clone();
    let func = FuncRef::adopt(func);
    let name = func.name().to_string();
    heap.new_function(&name, move |heap, args| {
        let mut host_args = Vec::with_capacity(args.len());
        for arg in args {
            host_args.push(to_host(&rt, heap, arg)?);
        }
        let result = func
            .invoke(&host_args)
            .map_err(|err| EngineError::Host(err.to_string()))?;
        to_engine(&rt, heap, &result)
    })
}

/// Wrap an engine callable as a host callable. The engine function is kept
/// alive through a rooted handle owned by the returned wrapper, registered
/// with the liveness bridge.
fn engine_fn_trampoline(
    rt: &BridgeRt,
    heap: &mut Heap,
    value: &EngineValue,
    name: &str,
) -> Result<HostValue, EngineError> {
    let root = heap.root(value.clone());
    let call_rt = rt.clone();
    let func = FuncRef::new(name, move |args| {
        let mut heap = call_rt
            .heap
            .try_borrow_mut()
            .map_err(|_| HostError::Call("re-entrant engine call".into()))?;
        let heap = &mut *heap;
        let callee = heap
            .root_value(root)
            .ok_or_else(|| HostError::Call("engine callable was released".into()))?;
        let mut engine_args = Vec::with_capacity(args.len());
        for arg in args {
            engine_args.push(
                to_engine(&call_rt, heap, arg).map_err(|e| call_rt.translator.translate(&e))?,
            );
        }
        let result = heap
            .call(&callee, &engine_args)
            .map_err(|e| call_rt.translator.translate(&e))?;
        to_host(&call_rt, heap, &result).map_err(|e| call_rt.translator.translate(&e))
    });

    let wrapper = HostValue::Func(func);
    rt.liveness
        .borrow_mut()
        .associate(&wrapper, root)
        .map_err(|err| EngineError::Host(err.to_string()))?;
    tracing::trace!(name, "engine callable trampolined to host");
    Ok(wrapper)
}

// ----------------------------------------------------------------------
// Iteration across the boundary
// ----------------------------------------------------------------------

/// Expose a host iterator to the engine. Each engine-side advance pulls
/// exactly one element. Exhaustion is a sentinel, and the benign transient
/// host-internal class is swallowed and treated as exhaustion; every other
/// host failure propagates as an engine error.
pub fn wrap_host_iter(rt: &BridgeRt, heap: &mut Heap, iter: IterRef) -> EngineValue {
    let rt = rt.clone();
    heap.new_native_iter(move |heap| match iter.advance() {
        Ok(Some(item)) => Ok(Some(to_engine(&rt, heap, &item)?)),
        Ok(None) => Ok(None),
        Err(HostError::Internal(msg)) => {
            // Known transient internal failure class; treated as normal
            // exhaustion. See the regression test before widening this.
            tracing::debug!(%msg, "transient host error during iteration treated as exhaustion");
            Ok(None)
        }
        Err(err) => Err(EngineError::Host(err.to_string())),
    })
}

struct EngineIter {
    rt: BridgeRt,
    root: trestle_engine::RootId,
}

impl HostIterate for EngineIter {
    fn advance(&mut self) -> Result<Option<HostValue>, HostError> {
        let mut heap = self
            .rt
            .heap
            .try_borrow_mut()
            .map_err(|_| HostError::Call("re-entrant engine call".into()))?;
        let heap = &mut *heap;
        let iter = heap
            .root_value(self.root)
            .ok_or_else(|| HostError::Call("engine iterator was released".into()))?;
        let result = heap
            .iter_next(&iter)
            .map_err(|e| self.rt.translator.translate(&e))?;
        let done = heap
            .get_prop(&result, &trestle_engine::PropKey::str("done"))
            .map_err(|e| self.rt.translator.translate(&e))?;
        if done.truthy() {
            return Ok(None);
        }
        let value = heap
            .get_prop(&result, &trestle_engine::PropKey::str("value"))
            .map_err(|e| self.rt.translator.translate(&e))?;
        let host = to_host(&self.rt, heap, &value).map_err(|e| self.rt.translator.translate(&e))?;
        Ok(Some(host))
    }
}



/// Wrap an engine iterator as a host iterable, rooted for as long as the
/// host wrapper is associated.
fn engine_iter_to_host(
    rt: &BridgeRt,
    heap: &mut Heap,
    value: &EngineValue,
) -> Result<HostValue, EngineError> {
    let root = heap.root(value.clone());
    let iter = IterRef::new(EngineIter { rt: rt.clone(), root });
    let wrapper = HostValue::Iter(iter);
    rt.liveness
        .borrow_mut()
        .associate(&wrapper, root)
        .map_err(|err| EngineError::Host(err.to_string()))?;
    Ok(wrapper)
}
