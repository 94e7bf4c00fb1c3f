//! An in-process engine with allocation accounting.
//!
//! [`FakeEngine`] implements the whole engine ABI on top of [`Expr`] trees.
//! Every handle, string, array and failure record it hands out is tracked,
//! so tests can assert that the bindings release each of them exactly once.
//!
//! ```rust,ignore
//! let fake = FakeEngine::new();
//! let engine = Engine::new(fake.clone());
//! drop(engine.parse("x + 1")?);
//! assert!(fake.ledger().is_balanced());
//! ```

use crate::calculus;
use crate::expr::{apply_function, parse, Expr};
use crate::ledger::Ledger;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::ffi::{c_char, CStr};
use std::sync::Arc;
use symbridge_abi::buffer::{release_string, string_into_raw};
use symbridge_abi::{
    symbols, ApproachFrom, DoubleTuple, EntityRef, ForeignEngine, LongTuple, MathFunction,
    NativeArray, NativeErrorCode,
};

/// Error name for rejected expression text.
pub const PARSE_ERROR: &str = "UnhandledParseException";
/// Error name for unknown or released handles.
pub const INVALID_HANDLE: &str = "InvalidHandleException";
/// Error name for failed numeric casts.
pub const CANNOT_EVAL: &str = "CannotEvalException";
/// Error name for failed operations.
pub const ENGINE_ERROR: &str = "MathEngineException";

struct Failure {
    name: &'static str,
    message: String,
}

impl Failure {
    fn new(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            message: message.into(),
        }
    }

    fn engine(message: String) -> Self {
        Self::new(ENGINE_ERROR, message)
    }
}

#[derive(Default)]
struct State {
    next_handle: i32,
    live: HashMap<i32, Expr>,
    released: HashSet<i32>,
    strings: HashSet<usize>,
    arrays: HashSet<usize>,
    records: HashSet<usize>,
    missing: HashSet<MathFunction>,
    queued: HashMap<&'static str, VecDeque<(String, String)>>,
    ledger: Ledger,
}

impl State {
    fn expr(&self, handle: EntityRef) -> Result<&Expr, Failure> {
        self.live.get(&handle.into_raw()).ok_or_else(|| {
            Failure::new(
                INVALID_HANDLE,
                format!("handle {} is not alive", handle.into_raw()),
            )
        })
    }

    fn variable(&self, handle: EntityRef) -> Result<&str, Failure> {
        match self.expr(handle)? {
            Expr::Symbol(name) => Ok(name.as_str()),
            other => Err(Failure::engine(format!("{other} is not a variable"))),
        }
    }

    fn issue_handle(&mut self, expr: Expr) -> EntityRef {
        self.next_handle += 1;
        let raw = self.next_handle;
        self.live.insert(raw, expr);
        self.ledger.handles_issued += 1;
        EntityRef::from_raw(raw)
    }

    fn issue_string(&mut self, text: &str) -> *mut c_char {
        let ptr = string_into_raw(text);
        self.strings.insert(ptr as usize);
        self.ledger.strings_issued += 1;
        ptr
    }

    fn issue_array(&mut self, exprs: Vec<Expr>) -> Result<NativeArray, Failure> {
        let refs: Vec<EntityRef> = exprs.into_iter().map(|e| self.issue_handle(e)).collect();
        let array = NativeArray::from_vec(refs)
            .ok_or_else(|| Failure::engine("array too long".to_owned()))?;
        if !array.is_null() {
            self.arrays.insert(array.refs as usize);
        }
        self.ledger.arrays_issued += 1;
        Ok(array)
    }

    fn issue_record(&mut self, symbol: &str, name: &str, message: &str) -> NativeErrorCode {
        let trace = format!("   at FakeEngine.{symbol}()\n   at symbridge_testkit.fake");
        let code = NativeErrorCode::failure(name, message, &trace);
        self.records.insert(code.name as usize);
        self.ledger.error_records_issued += 1;
        code
    }
}

/// In-process engine for tests. Clones share state.
#[derive(Clone, Default)]
pub struct FakeEngine {
    state: Arc<Mutex<State>>,
}

impl FakeEngine {
    /// Creates an engine exporting every elementary function.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops exporting `function`.
    #[must_use]
    pub fn without_function(self, function: MathFunction) -> Self {
        self.state.lock().missing.insert(function);
        self
    }

    /// Makes the next call to `symbol` fail with the given error.
    pub fn fail_next(&self, symbol: &'static str, name: &str, message: &str) {
        self.state
            .lock()
            .queued
            .entry(symbol)
            .or_default()
            .push_back((name.to_owned(), message.to_owned()));
    }

    /// Snapshot of the allocation ledger.
    pub fn ledger(&self) -> Ledger {
        self.state.lock().ledger.clone()
    }

    /// Issues a tracked failure record, as an engine call would.
    pub fn failure_record(&self, name: &str, message: &str, stack_trace: &str) -> NativeErrorCode {
        let mut state = self.state.lock();
        let code = NativeErrorCode::failure(name, message, stack_trace);
        state.records.insert(code.name as usize);
        state.ledger.error_records_issued += 1;
        code
    }

    /// Issues a tracked string, as a string-returning call would.
    pub fn issue_string(&self, text: &str) -> *mut c_char {
        self.state.lock().issue_string(text)
    }

    /// Parses `text` and issues a handle for it.
    ///
    /// # Panics
    ///
    /// Panics if `text` does not parse.
    pub fn issue_entity(&self, text: &str) -> EntityRef {
        let expr = parse(text).unwrap_or_else(|e| panic!("invalid fixture '{text}': {e}"));
        self.state.lock().issue_handle(expr)
    }

    /// The expression behind a live handle.
    pub fn expr(&self, handle: EntityRef) -> Option<Expr> {
        self.state.lock().live.get(&handle.into_raw()).cloned()
    }

    /// Runs one call: counts it, honours queued failures and writes the
    /// payload on success.
    fn produce<T, F>(&self, symbol: &'static str, out: &mut T, op: F) -> NativeErrorCode
    where
        F: FnOnce(&mut State) -> Result<T, Failure>,
    {
        let mut state = self.state.lock();
        state.ledger.record_call(symbol);

        if let Some((name, message)) = state.queued.get_mut(symbol).and_then(VecDeque::pop_front) {
            return state.issue_record(symbol, &name, &message);
        }
        match op(&mut *state) {
            Ok(value) => {
                *out = value;
                NativeErrorCode::ok()
            }
            Err(failure) => state.issue_record(symbol, failure.name, &failure.message),
        }
    }

    fn entity_op<F>(&self, symbol: &'static str, out: &mut EntityRef, op: F) -> NativeErrorCode
    where
        F: FnOnce(&State) -> Result<Expr, Failure>,
    {
        self.produce(symbol, out, |state| {
            let expr = op(&*state)?;
            Ok(state.issue_handle(expr))
        })
    }

    fn string_op<F>(&self, symbol: &'static str, out: &mut *mut c_char, op: F) -> NativeErrorCode
    where
        F: FnOnce(&State) -> Result<String, Failure>,
    {
        self.produce(symbol, out, |state| {
            let text = op(&*state)?;
            Ok(state.issue_string(&text))
        })
    }

    fn array_op<F>(&self, symbol: &'static str, out: &mut NativeArray, op: F) -> NativeErrorCode
    where
        F: FnOnce(&State) -> Result<Vec<Expr>, Failure>,
    {
        self.produce(symbol, out, |state| {
            let exprs = op(&*state)?;
            state.issue_array(exprs)
        })
    }

    fn binary_op(
        &self,
        symbol: &'static str,
        a: EntityRef,
        b: EntityRef,
        out: &mut EntityRef,
        build: fn(Expr, Expr) -> Expr,
    ) -> NativeErrorCode {
        self.entity_op(symbol, out, |state| {
            Ok(build(state.expr(a)?.clone(), state.expr(b)?.clone()))
        })
    }

    fn calculus_op(
        &self,
        symbol: &'static str,
        entity: EntityRef,
        var: EntityRef,
        out: &mut EntityRef,
        run: fn(&Expr, &str) -> Result<Expr, String>,
    ) -> NativeErrorCode {
        self.entity_op(symbol, out, |state| {
            run(state.expr(entity)?, state.variable(var)?).map_err(Failure::engine)
        })
    }

    fn release(&self, symbol: &'static str, known: bool, what: &str) -> NativeErrorCode {
        let mut state = self.state.lock();
        if known {
            return NativeErrorCode::ok();
        }
        state.ledger.double_frees += 1;
        state.issue_record(symbol, INVALID_HANDLE, &format!("{what} was not issued or is already released"))
    }
}

fn evaled(expr: &Expr) -> Expr {
    match expr.eval() {
        Some(value) => Expr::Number(value),
        None => expr.simplify(),
    }
}

fn cannot_eval(expr: &Expr, target: &str) -> Failure {
    Failure::new(CANNOT_EVAL, format!("{expr} cannot be cast to {target}"))
}

impl ForeignEngine for FakeEngine {
    fn maths_from_string(&self, text: &CStr, out: &mut EntityRef) -> NativeErrorCode {
        self.produce(symbols::MATHS_FROM_STRING, out, |state| {
            let text = text
                .to_str()
                .map_err(|_| Failure::new(PARSE_ERROR, "expression text is not UTF-8"))?;
            let expr = parse(text).map_err(|e| Failure::new(PARSE_ERROR, e.to_string()))?;
            Ok(state.issue_handle(expr))
        })
    }

    fn entity_to_string(&self, entity: EntityRef, out: &mut *mut c_char) -> NativeErrorCode {
        self.string_op(symbols::ENTITY_TO_STRING, out, |state| {
            Ok(state.expr(entity)?.to_string())
        })
    }

    fn entity_latexise(&self, entity: EntityRef, out: &mut *mut c_char) -> NativeErrorCode {
        self.string_op(symbols::ENTITY_LATEXISE, out, |state| {
            Ok(state.expr(entity)?.latex())
        })
    }

    fn entity_differentiate(
        &self,
        entity: EntityRef,
        var: EntityRef,
        out: &mut EntityRef,
    ) -> NativeErrorCode {
        self.calculus_op(symbols::ENTITY_DIFFERENTIATE, entity, var, out, calculus::differentiate)
    }

    fn entity_integrate(
        &self,
        entity: EntityRef,
        var: EntityRef,
        out: &mut EntityRef,
    ) -> NativeErrorCode {
        self.calculus_op(symbols::ENTITY_INTEGRATE, entity, var, out, calculus::integrate)
    }

    fn entity_limit(
        &self,
        entity: EntityRef,
        var: EntityRef,
        dest: EntityRef,
        from: ApproachFrom,
        out: &mut EntityRef,
    ) -> NativeErrorCode {
        self.produce(symbols::ENTITY_LIMIT, out, |state| {
            state.ledger.last_approach = Some(from);
            let result = calculus::limit(
                state.expr(entity)?,
                state.variable(var)?,
                state.expr(dest)?,
                from,
            )
            .map_err(Failure::engine)?;
            Ok(state.issue_handle(result))
        })
    }

    fn entity_solve(
        &self,
        entity: EntityRef,
        var: EntityRef,
        out: &mut EntityRef,
    ) -> NativeErrorCode {
        self.calculus_op(symbols::ENTITY_SOLVE, entity, var, out, calculus::solve)
    }

    fn entity_solve_equation(
        &self,
        entity: EntityRef,
        var: EntityRef,
        out: &mut EntityRef,
    ) -> NativeErrorCode {
        self.calculus_op(
            symbols::ENTITY_SOLVE_EQUATION,
            entity,
            var,
            out,
            calculus::solve_equation,
        )
    }

    fn entity_simplify(&self, entity: EntityRef, out: &mut EntityRef) -> NativeErrorCode {
        self.entity_op(symbols::ENTITY_SIMPLIFY, out, |state| {
            Ok(state.expr(entity)?.simplify())
        })
    }

    fn entity_evaled(&self, entity: EntityRef, out: &mut EntityRef) -> NativeErrorCode {
        self.entity_op(symbols::ENTITY_EVALED, out, |state| Ok(evaled(state.expr(entity)?)))
    }

    fn entity_inner_simplified(&self, entity: EntityRef, out: &mut EntityRef) -> NativeErrorCode {
        self.entity_op(symbols::ENTITY_INNER_SIMPLIFIED, out, |state| {
            Ok(state.expr(entity)?.simplify())
        })
    }

    fn entity_alternate(&self, entity: EntityRef, out: &mut NativeArray) -> NativeErrorCode {
        self.array_op(symbols::ENTITY_ALTERNATE, out, |state| {
            let expr = state.expr(entity)?;
            let simplified = expr.simplify();
            let mut forms = vec![expr.clone()];
            if simplified != *expr {
                forms.push(simplified);
            }
            Ok(forms)
        })
    }

    fn op_entity_add(&self, a: EntityRef, b: EntityRef, out: &mut EntityRef) -> NativeErrorCode {
        self.binary_op(symbols::OP_ENTITY_ADD, a, b, out, Expr::sum)
    }

    fn op_entity_sub(&self, a: EntityRef, b: EntityRef, out: &mut EntityRef) -> NativeErrorCode {
        self.binary_op(symbols::OP_ENTITY_SUB, a, b, out, Expr::minus)
    }

    fn op_entity_mul(&self, a: EntityRef, b: EntityRef, out: &mut EntityRef) -> NativeErrorCode {
        self.binary_op(symbols::OP_ENTITY_MUL, a, b, out, Expr::mul)
    }

    fn op_entity_div(&self, a: EntityRef, b: EntityRef, out: &mut EntityRef) -> NativeErrorCode {
        self.binary_op(symbols::OP_ENTITY_DIV, a, b, out, Expr::div)
    }

    fn entity_nodes(&self, entity: EntityRef, out: &mut NativeArray) -> NativeErrorCode {
        self.array_op(symbols::ENTITY_NODES, out, |state| {
            Ok(state.expr(entity)?.preorder().into_iter().cloned().collect())
        })
    }

    fn entity_vars(&self, entity: EntityRef, out: &mut NativeArray) -> NativeErrorCode {
        self.array_op(symbols::ENTITY_VARS, out, |state| {
            Ok(state.expr(entity)?.free_vars().into_iter().map(Expr::Symbol).collect())
        })
    }

    fn entity_vars_and_constants(
        &self,
        entity: EntityRef,
        out: &mut NativeArray,
    ) -> NativeErrorCode {
        self.array_op(symbols::ENTITY_VARS_AND_CONSTANTS, out, |state| {
            Ok(state.expr(entity)?.symbols().into_iter().map(Expr::Symbol).collect())
        })
    }

    fn entity_direct_children(&self, entity: EntityRef, out: &mut NativeArray) -> NativeErrorCode {
        self.array_op(symbols::ENTITY_DIRECT_CHILDREN, out, |state| {
            Ok(state.expr(entity)?.children().into_iter().cloned().collect())
        })
    }

    fn entity_to_long(&self, entity: EntityRef, out: &mut i64) -> NativeErrorCode {
        self.produce(symbols::ENTITY_TO_LONG, out, |state| {
            let expr = state.expr(entity)?;
            match expr.eval() {
                Some(v) if v.fract() == 0.0 && v.abs() < 9.0e18 => Ok(v as i64),
                _ => Err(cannot_eval(expr, "an integer")),
            }
        })
    }

    fn entity_to_rational(&self, entity: EntityRef, out: &mut LongTuple) -> NativeErrorCode {
        self.produce(symbols::ENTITY_TO_RATIONAL, out, |state| {
            let expr = state.expr(entity)?;
            let (first, second) = expr
                .eval_rational()
                .ok_or_else(|| cannot_eval(expr, "a rational"))?;
            Ok(LongTuple { first, second })
        })
    }

    fn entity_to_double(&self, entity: EntityRef, out: &mut f64) -> NativeErrorCode {
        self.produce(symbols::ENTITY_TO_DOUBLE, out, |state| {
            let expr = state.expr(entity)?;
            expr.eval().ok_or_else(|| cannot_eval(expr, "a real"))
        })
    }

    fn entity_to_complex(&self, entity: EntityRef, out: &mut DoubleTuple) -> NativeErrorCode {
        self.produce(symbols::ENTITY_TO_COMPLEX, out, |state| {
            let expr = state.expr(entity)?;
            let (first, second) = expr
                .eval_complex()
                .ok_or_else(|| cannot_eval(expr, "a complex"))?;
            Ok(DoubleTuple { first, second })
        })
    }

    fn has_function(&self, function: MathFunction) -> bool {
        !self.state.lock().missing.contains(&function)
    }

    fn math_function(
        &self,
        function: MathFunction,
        args: &[EntityRef],
        out: &mut EntityRef,
    ) -> Option<NativeErrorCode> {
        if !self.has_function(function) {
            return None;
        }
        Some(self.entity_op(function.symbol(), out, |state| {
            if args.len() != function.arity() {
                return Err(Failure::engine(format!(
                    "{} takes {} argument(s)",
                    function.name(),
                    function.arity()
                )));
            }
            let args = args
                .iter()
                .map(|&a| state.expr(a).cloned())
                .collect::<Result<Vec<_>, _>>()?;
            Ok(apply_function(function, args))
        }))
    }

    fn free_entity(&self, entity: EntityRef) -> NativeErrorCode {
        let mut state = self.state.lock();
        state.ledger.record_call(symbols::FREE_ENTITY);

        let raw = entity.into_raw();
        if state.live.remove(&raw).is_some() {
            state.released.insert(raw);
            state.ledger.handles_freed += 1;
            return NativeErrorCode::ok();
        }
        if state.released.contains(&raw) {
            state.ledger.double_frees += 1;
        } else {
            state.ledger.invalid_frees += 1;
        }
        state.issue_record(
            symbols::FREE_ENTITY,
            INVALID_HANDLE,
            &format!("handle {raw} is not alive"),
        )
    }

    unsafe fn free_native_array(&self, array: NativeArray) -> NativeErrorCode {
        let known = {
            let mut state = self.state.lock();
            state.ledger.record_call(symbols::FREE_NATIVE_ARRAY);
            if array.is_null() {
                state.ledger.arrays_freed += 1;
                return NativeErrorCode::ok();
            }
            let known = state.arrays.remove(&(array.refs as usize));
            if known {
                state.ledger.arrays_freed += 1;
            }
            known
        };
        if known {
            drop(array.into_vec());
        }
        self.release(symbols::FREE_NATIVE_ARRAY, known, "array")
    }

    unsafe fn free_error_code(&self, error: NativeErrorCode) -> NativeErrorCode {
        let known = {
            let mut state = self.state.lock();
            state.ledger.record_call(symbols::FREE_ERROR_CODE);
            if error.is_ok() {
                return NativeErrorCode::ok();
            }
            let known = state.records.remove(&(error.name as usize));
            if known {
                state.ledger.error_records_freed += 1;
            }
            known
        };
        if known {
            error.release_allocated();
        }
        self.release(symbols::FREE_ERROR_CODE, known, "error record")
    }

    unsafe fn free_string(&self, string: *mut c_char) -> NativeErrorCode {
        let known = {
            let mut state = self.state.lock();
            state.ledger.record_call(symbols::FREE_STRING);
            let known = state.strings.remove(&(string as usize));
            if known {
                state.ledger.strings_freed += 1;
            }
            known
        };
        if known {
            release_string(string);
        }
        self.release(symbols::FREE_STRING, known, "string")
    }
}
