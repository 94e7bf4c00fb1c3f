//! Expression values.

use crate::cache::FieldCache;
use crate::engine::Engine;
use crate::error::{BindingError, BindingResult, FailureKind, ResourceError};
use crate::handle::HandleOwner;
use symbridge_abi::{
    symbols, ApproachFrom, DoubleTuple, EntityRef, ForeignEngine, LongTuple, MathFunction,
    NativeArray, NativeErrorCode,
};
use std::fmt;
use std::sync::Arc;

/// A complex number returned by [`Entity::as_complex`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex {
    /// Real part.
    pub re: f64,
    /// Imaginary part.
    pub im: f64,
}

/// One owned handle plus its derived-property caches.
struct EntityInstance {
    owner: HandleOwner,
    nodes: FieldCache<Vec<Entity>>,
    vars: FieldCache<Vec<Entity>>,
    vars_and_constants: FieldCache<Vec<Entity>>,
    direct_children: FieldCache<Vec<Entity>>,
    evaled: FieldCache<Entity>,
    inner_simplified: FieldCache<Entity>,
    string: FieldCache<String>,
}

impl EntityInstance {
    fn new(owner: HandleOwner) -> Self {
        Self {
            owner,
            nodes: FieldCache::new(),
            vars: FieldCache::new(),
            vars_and_constants: FieldCache::new(),
            direct_children: FieldCache::new(),
            evaled: FieldCache::new(),
            inner_simplified: FieldCache::new(),
            string: FieldCache::new(),
        }
    }

    fn engine(&self) -> &Engine {
        self.owner.engine()
    }

    fn reference(&self) -> EntityRef {
        self.owner.reference()
    }
}

/// An immutable symbolic expression held by the engine.
///
/// Cloning shares the underlying handle; the engine releases the node when
/// the last clone is dropped. Every transformation returns a new entity.
///
/// `Entity::default()` is the empty entity: it owns no handle, dropping it
/// releases nothing, and every operation on it fails with
/// [`ResourceError::EmptyEntity`].
#[derive(Clone, Default)]
pub struct Entity {
    instance: Option<Arc<EntityInstance>>,
}

impl Entity {
    /// Takes ownership of a handle freshly produced by `engine`.
    pub(crate) fn adopt(engine: Engine, reference: EntityRef) -> Self {
        Self {
            instance: Some(Arc::new(EntityInstance::new(HandleOwner::adopt(
                engine, reference,
            )))),
        }
    }

    /// Returns true for the empty entity.
    pub fn is_empty(&self) -> bool {
        self.instance.is_none()
    }

    /// The engine that issued this entity.
    pub fn engine(&self) -> Option<&Engine> {
        self.instance.as_deref().map(EntityInstance::engine)
    }

    /// Returns true if both entities share one handle.
    pub fn shares_handle_with(&self, other: &Entity) -> bool {
        match (&self.instance, &other.instance) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Number of entities sharing this handle.
    pub fn share_count(&self) -> usize {
        self.instance.as_ref().map_or(0, Arc::strong_count)
    }

    fn instance(&self) -> BindingResult<&EntityInstance> {
        self.instance
            .as_deref()
            .ok_or(BindingError::Resource(ResourceError::EmptyEntity))
    }

    /// Resolves `other` against this entity's engine.
    fn peer(&self, other: &Entity) -> BindingResult<(&EntityInstance, EntityRef)> {
        let this = self.instance()?;
        let other = other.instance()?;
        if !this.engine().same_engine(other.engine()) {
            return Err(ResourceError::EngineMismatch.into());
        }
        Ok((this, other.reference()))
    }

    fn unary<F>(&self, symbol: &'static str, call: F) -> BindingResult<Entity>
    where
        F: FnOnce(&dyn ForeignEngine, EntityRef, &mut EntityRef) -> NativeErrorCode,
    {
        let this = self.instance()?;
        let reference = this.reference();
        this.engine()
            .call_entity(symbol, FailureKind::Engine, |engine, out| call(engine, reference, out))
    }

    fn binary<F>(&self, other: &Entity, symbol: &'static str, call: F) -> BindingResult<Entity>
    where
        F: FnOnce(
            &dyn ForeignEngine,
            EntityRef,
            EntityRef,
            &mut EntityRef,
        ) -> NativeErrorCode,
    {
        let (this, other) = self.peer(other)?;
        let reference = this.reference();
        this.engine().call_entity(symbol, FailureKind::Engine, |engine, out| {
            call(engine, reference, other, out)
        })
    }

    // === Output ===

    /// The engine's string form. Computed once per handle.
    pub fn stringify(&self) -> BindingResult<&str> {
        let this = self.instance()?;
        let reference = this.reference();
        this.string
            .get_or_try_init(|| {
                this.engine()
                    .call_string(symbols::ENTITY_TO_STRING, |engine, out| {
                        engine.entity_to_string(reference, out)
                    })
            })
            .map(String::as_str)
    }

    /// LaTeX rendering.
    pub fn latexise(&self) -> BindingResult<String> {
        let this = self.instance()?;
        let reference = this.reference();
        this.engine()
            .call_string(symbols::ENTITY_LATEXISE, |engine, out| {
                engine.entity_latexise(reference, out)
            })
    }

    // === Calculus ===

    /// Derivative with respect to `var`.
    pub fn differentiate(&self, var: &Entity) -> BindingResult<Entity> {
        self.binary(var, symbols::ENTITY_DIFFERENTIATE, |engine, e, v, out| {
            engine.entity_differentiate(e, v, out)
        })
    }

    /// Antiderivative with respect to `var`.
    pub fn integrate(&self, var: &Entity) -> BindingResult<Entity> {
        self.binary(var, symbols::ENTITY_INTEGRATE, |engine, e, v, out| {
            engine.entity_integrate(e, v, out)
        })
    }

    /// Two-sided limit as `var` approaches `dest`.
    pub fn limit(&self, var: &Entity, dest: &Entity) -> BindingResult<Entity> {
        self.limit_from(var, dest, ApproachFrom::BothSides)
    }

    /// Limit as `var` approaches `dest` from the given side.
    pub fn limit_from(
        &self,
        var: &Entity,
        dest: &Entity,
        from: ApproachFrom,
    ) -> BindingResult<Entity> {
        let (this, var) = self.peer(var)?;
        let (_, dest) = self.peer(dest)?;
        let reference = this.reference();
        this.engine()
            .call_entity(symbols::ENTITY_LIMIT, FailureKind::Engine, |engine, out| {
                engine.entity_limit(reference, var, dest, from, out)
            })
    }

    /// Solves this statement for `var`.
    pub fn solve(&self, var: &Entity) -> BindingResult<Entity> {
        self.binary(var, symbols::ENTITY_SOLVE, |engine, e, v, out| {
            engine.entity_solve(e, v, out)
        })
    }

    /// Solves `self = 0` for `var`.
    pub fn solve_equation(&self, var: &Entity) -> BindingResult<Entity> {
        self.binary(var, symbols::ENTITY_SOLVE_EQUATION, |engine, e, v, out| {
            engine.entity_solve_equation(e, v, out)
        })
    }

    // === Transformation ===

    /// Simplified form.
    pub fn simplify(&self) -> BindingResult<Entity> {
        self.unary(symbols::ENTITY_SIMPLIFY, |engine, e, out| {
            engine.entity_simplify(e, out)
        })
    }

    /// Evaluated form. Computed once per handle.
    pub fn evaled(&self) -> BindingResult<&Entity> {
        let this = self.instance()?;
        this.evaled.get_or_try_init(|| {
            self.unary(symbols::ENTITY_EVALED, |engine, e, out| {
                engine.entity_evaled(e, out)
            })
        })
    }

    /// Form with every inner node simplified. Computed once per handle.
    pub fn inner_simplified(&self) -> BindingResult<&Entity> {
        let this = self.instance()?;
        this.inner_simplified.get_or_try_init(|| {
            self.unary(symbols::ENTITY_INNER_SIMPLIFIED, |engine, e, out| {
                engine.entity_inner_simplified(e, out)
            })
        })
    }

    /// Equivalent alternate forms.
    pub fn alternate(&self) -> BindingResult<Vec<Entity>> {
        let this = self.instance()?;
        let reference = this.reference();
        this.engine()
            .call_array(symbols::ENTITY_ALTERNATE, |engine, out| {
                engine.entity_alternate(reference, out)
            })
    }

    // === Structure ===

    fn cached_list<F>(
        &self,
        select: fn(&EntityInstance) -> &FieldCache<Vec<Entity>>,
        symbol: &'static str,
        call: F,
    ) -> BindingResult<&[Entity]>
    where
        F: FnOnce(
            &dyn ForeignEngine,
            EntityRef,
            &mut NativeArray,
        ) -> NativeErrorCode,
    {
        let this = self.instance()?;
        let reference = this.reference();
        select(this)
            .get_or_try_init(|| {
                this.engine()
                    .call_array(symbol, |engine, out| call(engine, reference, out))
            })
            .map(Vec::as_slice)
    }

    /// Every node, root first, then children in engine order.
    /// Computed once per handle.
    pub fn nodes(&self) -> BindingResult<&[Entity]> {
        self.cached_list(|i| &i.nodes, symbols::ENTITY_NODES, |engine, e, out| {
            engine.entity_nodes(e, out)
        })
    }

    /// Free variables. Computed once per handle.
    pub fn vars(&self) -> BindingResult<&[Entity]> {
        self.cached_list(|i| &i.vars, symbols::ENTITY_VARS, |engine, e, out| {
            engine.entity_vars(e, out)
        })
    }

    /// Free variables and named constants. Computed once per handle.
    pub fn vars_and_constants(&self) -> BindingResult<&[Entity]> {
        self.cached_list(
            |i| &i.vars_and_constants,
            symbols::ENTITY_VARS_AND_CONSTANTS,
            |engine, e, out| engine.entity_vars_and_constants(e, out),
        )
    }

    /// Immediate children. Computed once per handle.
    pub fn direct_children(&self) -> BindingResult<&[Entity]> {
        self.cached_list(
            |i| &i.direct_children,
            symbols::ENTITY_DIRECT_CHILDREN,
            |engine, e, out| engine.entity_direct_children(e, out),
        )
    }

    // === Numeric casts ===

    /// Value as a 64-bit integer.
    pub fn as_integer(&self) -> BindingResult<i64> {
        let this = self.instance()?;
        let reference = this.reference();
        this.engine()
            .call_value(symbols::ENTITY_TO_LONG, |engine, out| {
                engine.entity_to_long(reference, out)
            })
    }

    /// Value as a `(numerator, denominator)` pair.
    pub fn as_rational(&self) -> BindingResult<(i64, i64)> {
        let this = self.instance()?;
        let reference = this.reference();
        let tuple: LongTuple = this
            .engine()
            .call_value(symbols::ENTITY_TO_RATIONAL, |engine, out| {
                engine.entity_to_rational(reference, out)
            })?;
        Ok((tuple.first, tuple.second))
    }

    /// Value as a double.
    pub fn as_real(&self) -> BindingResult<f64> {
        let this = self.instance()?;
        let reference = this.reference();
        this.engine()
            .call_value(symbols::ENTITY_TO_DOUBLE, |engine, out| {
                engine.entity_to_double(reference, out)
            })
    }

    /// Value as a complex number.
    pub fn as_complex(&self) -> BindingResult<Complex> {
        let this = self.instance()?;
        let reference = this.reference();
        let tuple: DoubleTuple = this
            .engine()
            .call_value(symbols::ENTITY_TO_COMPLEX, |engine, out| {
                engine.entity_to_complex(reference, out)
            })?;
        Ok(Complex {
            re: tuple.first,
            im: tuple.second,
        })
    }

    // === Elementary functions ===

    /// Applies an elementary function with this entity as first argument.
    ///
    /// `rest` holds the remaining arguments of binary functions.
    pub fn apply(&self, function: MathFunction, rest: &[&Entity]) -> BindingResult<Entity> {
        let this = self.instance()?;
        let engine = this.engine();

        if rest.len() + 1 != function.arity() {
            return Err(BindingError::invalid_argument(format!(
                "{} takes {} argument(s), got {}",
                function.name(),
                function.arity(),
                rest.len() + 1
            )));
        }
        if !engine.has_function(function) {
            return Err(BindingError::Unsupported {
                symbol: function.symbol(),
            });
        }

        let mut args = Vec::with_capacity(function.arity());
        args.push(this.reference());
        for other in rest {
            let (_, reference) = self.peer(other)?;
            args.push(reference);
        }

        let mut out = EntityRef::invalid();
        let mut exported = true;
        engine.call(function.symbol(), FailureKind::Engine, |foreign| {
            foreign
                .math_function(function, &args, &mut out)
                .unwrap_or_else(|| {
                    exported = false;
                    NativeErrorCode::ok()
                })
        })?;
        if !exported {
            return Err(BindingError::Unsupported {
                symbol: function.symbol(),
            });
        }
        Ok(Entity::adopt(engine.clone(), out))
    }

    pub(crate) fn add_entity(&self, other: &Entity) -> BindingResult<Entity> {
        self.binary(other, symbols::OP_ENTITY_ADD, |engine, a, b, out| {
            engine.op_entity_add(a, b, out)
        })
    }

    pub(crate) fn sub_entity(&self, other: &Entity) -> BindingResult<Entity> {
        self.binary(other, symbols::OP_ENTITY_SUB, |engine, a, b, out| {
            engine.op_entity_sub(a, b, out)
        })
    }

    pub(crate) fn mul_entity(&self, other: &Entity) -> BindingResult<Entity> {
        self.binary(other, symbols::OP_ENTITY_MUL, |engine, a, b, out| {
            engine.op_entity_mul(a, b, out)
        })
    }

    pub(crate) fn div_entity(&self, other: &Entity) -> BindingResult<Entity> {
        self.binary(other, symbols::OP_ENTITY_DIV, |engine, a, b, out| {
            engine.op_entity_div(a, b, out)
        })
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stringify() {
            Ok(s) => f.write_str(s),
            Err(e) => write!(f, "<unprintable: {e}>"),
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Entity(<empty>)");
        }
        match self.stringify() {
            Ok(s) => write!(f, "Entity({s:?})"),
            Err(e) => write!(f, "Entity(<{e}>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symbridge_testkit::fake::{CANNOT_EVAL, ENGINE_ERROR};
    use symbridge_testkit::FakeEngine;

    fn setup() -> (FakeEngine, Engine) {
        let fake = FakeEngine::new();
        let engine = Engine::new(fake.clone());
        (fake, engine)
    }

    fn texts(entities: &[Entity]) -> Vec<String> {
        entities.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn cached_properties_call_the_engine_once() {
        let (fake, engine) = setup();
        let expr = engine.parse("2 * 3 + x").unwrap();

        for _ in 0..3 {
            expr.stringify().unwrap();
            expr.nodes().unwrap();
            expr.vars().unwrap();
            expr.vars_and_constants().unwrap();
            expr.direct_children().unwrap();
            expr.evaled().unwrap();
            expr.inner_simplified().unwrap();
        }

        let ledger = fake.ledger();
        for symbol in [
            symbols::ENTITY_TO_STRING,
            symbols::ENTITY_NODES,
            symbols::ENTITY_VARS,
            symbols::ENTITY_VARS_AND_CONSTANTS,
            symbols::ENTITY_DIRECT_CHILDREN,
            symbols::ENTITY_EVALED,
            symbols::ENTITY_INNER_SIMPLIFIED,
        ] {
            assert_eq!(ledger.calls(symbol), 1, "{symbol}");
        }
    }

    #[test]
    fn uncached_operations_call_every_time() {
        let (fake, engine) = setup();
        let expr = engine.parse("x + 0").unwrap();

        expr.simplify().unwrap();
        expr.simplify().unwrap();
        expr.latexise().unwrap();
        expr.latexise().unwrap();

        let ledger = fake.ledger();
        assert_eq!(ledger.calls(symbols::ENTITY_SIMPLIFY), 2);
        assert_eq!(ledger.calls(symbols::ENTITY_LATEXISE), 2);
    }

    #[test]
    fn nodes_start_at_the_root() {
        let (_fake, engine) = setup();
        let expr = engine.parse("x + 1").unwrap();

        assert_eq!(texts(expr.nodes().unwrap()), ["x + 1", "x", "1"]);
        assert_eq!(texts(expr.direct_children().unwrap()), ["x", "1"]);
        assert_eq!(engine.stats().arrays_released, 2);
    }

    #[test]
    fn vars_skip_constants() {
        let (_fake, engine) = setup();
        let expr = engine.parse("pi * r ^ 2 + h").unwrap();

        assert_eq!(texts(expr.vars().unwrap()), ["r", "h"]);
        assert_eq!(texts(expr.vars_and_constants().unwrap()), ["pi", "r", "h"]);
    }

    #[test]
    fn clones_release_once() {
        let (fake, engine) = setup();
        let a = engine.parse("x").unwrap();
        let b = a.clone();

        assert!(a.shares_handle_with(&b));
        assert_eq!(a.share_count(), 2);

        drop(a);
        assert_eq!(fake.ledger().handles_freed, 0);
        drop(b);

        let ledger = fake.ledger();
        assert_eq!(ledger.handles_freed, 1);
        assert_eq!(ledger.double_frees, 0);
    }

    #[test]
    fn cached_children_are_released_with_the_parent() {
        let (fake, engine) = setup();
        let expr = engine.parse("a * b + b").unwrap();
        assert_eq!(expr.nodes().unwrap().len(), 5);

        drop(expr);
        assert!(fake.ledger().is_balanced());
    }

    #[test]
    fn empty_entity_fails_without_engine_calls() {
        let (fake, engine) = setup();
        let x = engine.parse("x").unwrap();
        let empty = Entity::default();

        assert!(empty.is_empty());
        assert!(empty.engine().is_none());
        assert_eq!(empty.share_count(), 0);
        assert!(!empty.shares_handle_with(&Entity::default()));

        for err in [
            empty.stringify().map(|_| ()).unwrap_err(),
            empty.nodes().map(|_| ()).unwrap_err(),
            empty.simplify().map(|_| ()).unwrap_err(),
            empty.differentiate(&x).map(|_| ()).unwrap_err(),
            x.differentiate(&empty).map(|_| ()).unwrap_err(),
            empty.as_real().map(|_| ()).unwrap_err(),
        ] {
            assert!(matches!(
                err,
                BindingError::Resource(ResourceError::EmptyEntity)
            ));
        }

        assert_eq!(fake.ledger().calls(symbols::ENTITY_DIFFERENTIATE), 0);
        assert_eq!(format!("{empty:?}"), "Entity(<empty>)");
    }

    #[test]
    fn numeric_casts() {
        let (_fake, engine) = setup();

        let simplified = engine.parse("6").unwrap().simplify().unwrap();
        assert_eq!(simplified.evaled().unwrap().as_real().unwrap(), 6.0);

        let six = engine.parse("2 * 3").unwrap();
        assert_eq!(six.evaled().unwrap().as_real().unwrap(), 6.0);
        assert_eq!(six.as_integer().unwrap(), 6);
        assert_eq!(engine.parse("6 / 4").unwrap().as_rational().unwrap(), (3, 2));
        assert_eq!(
            engine.parse("3 + 4i").unwrap().as_complex().unwrap(),
            Complex { re: 3.0, im: 4.0 }
        );
    }

    #[test]
    fn failed_cast_carries_the_engine_error() {
        let (fake, engine) = setup();
        let x = engine.parse("x").unwrap();

        let err = x.as_integer().unwrap_err();
        assert!(!err.is_parse());
        assert_eq!(err.foreign().unwrap().name, CANNOT_EVAL);

        drop(x);
        assert!(fake.ledger().is_balanced());
    }

    #[test]
    fn calculus() {
        let (_fake, engine) = setup();
        let x = engine.parse("x").unwrap();

        let expr = engine.parse("a * x + 2").unwrap();
        assert_eq!(expr.differentiate(&x).unwrap().to_string(), "a");

        let expr = engine.parse("x").unwrap();
        assert_eq!(expr.integrate(&x).unwrap().to_string(), "x ^ 2 / 2");

        let expr = engine.parse("x ^ 2 - 4").unwrap();
        assert_eq!(expr.solve_equation(&x).unwrap().to_string(), "{ -2, 2 }");

        let statement = engine.parse("x ^ 2 = 4").unwrap();
        assert_eq!(statement.solve(&x).unwrap().to_string(), "{ -2, 2 }");
    }

    #[test]
    fn limit_passes_the_approach_side() {
        let (fake, engine) = setup();
        let expr = engine.parse("x + 1").unwrap();
        let x = engine.parse("x").unwrap();
        let two = engine.parse("2").unwrap();

        assert_eq!(expr.limit(&x, &two).unwrap().to_string(), "3");
        assert_eq!(fake.ledger().last_approach, Some(ApproachFrom::BothSides));

        assert_eq!(
            expr.limit_from(&x, &two, ApproachFrom::Left).unwrap().to_string(),
            "3"
        );
        assert_eq!(fake.ledger().last_approach, Some(ApproachFrom::Left));
    }

    #[test]
    fn calculus_needs_a_variable() {
        let (_fake, engine) = setup();
        let expr = engine.parse("x ^ 2").unwrap();
        let not_a_var = engine.parse("x + 1").unwrap();

        let err = expr.differentiate(&not_a_var).unwrap_err();
        assert_eq!(err.foreign().unwrap().name, ENGINE_ERROR);
    }

    #[test]
    fn rendering() {
        let (_fake, engine) = setup();
        let expr = engine.parse("x / 2").unwrap();

        assert_eq!(expr.latexise().unwrap(), "\\frac{x}{2}");
        assert_eq!(format!("{expr:?}"), "Entity(\"x / 2\")");

        let alternates = engine.parse("x * 1").unwrap().alternate().unwrap();
        assert_eq!(texts(&alternates), ["x * 1", "x"]);
    }

    #[test]
    fn inner_simplified_uses_its_own_symbol() {
        let (fake, engine) = setup();
        let expr = engine.parse("x * 1").unwrap();

        assert_eq!(expr.inner_simplified().unwrap().to_string(), "x");
        let ledger = fake.ledger();
        assert_eq!(ledger.calls(symbols::ENTITY_INNER_SIMPLIFIED), 1);
        assert_eq!(ledger.calls(symbols::ENTITY_SIMPLIFY), 0);
    }

    #[test]
    fn failures_are_not_cached() {
        let (fake, engine) = setup();
        let expr = engine.parse("x + 1").unwrap();

        fake.fail_next(symbols::ENTITY_NODES, ENGINE_ERROR, "transient");
        let err = expr.nodes().unwrap_err();
        assert_eq!(err.foreign().unwrap().message, "transient");

        assert_eq!(expr.nodes().unwrap().len(), 3);
        assert_eq!(fake.ledger().calls(symbols::ENTITY_NODES), 2);
    }

    #[test]
    fn elementary_functions() {
        let (_fake, engine) = setup();
        let x = engine.parse("x").unwrap();
        let two = engine.parse("2").unwrap();

        assert_eq!(x.apply(MathFunction::Sin, &[]).unwrap().to_string(), "sin(x)");
        assert_eq!(x.apply(MathFunction::Sqr, &[]).unwrap().to_string(), "x ^ 2");
        assert_eq!(
            two.apply(MathFunction::Log, &[&x]).unwrap().to_string(),
            "log(2, x)"
        );

        let err = x.apply(MathFunction::Pow, &[]).unwrap_err();
        assert!(matches!(err, BindingError::InvalidArgument { .. }));
    }

    #[test]
    fn missing_function_is_unsupported() {
        let fake = FakeEngine::new().without_function(MathFunction::Cosh);
        let engine = Engine::new(fake.clone());
        let x = engine.parse("x").unwrap();

        let err = x.apply(MathFunction::Cosh, &[]).unwrap_err();
        assert!(matches!(err, BindingError::Unsupported { .. }));
        assert_eq!(fake.ledger().calls(MathFunction::Cosh.symbol()), 0);
    }
}
