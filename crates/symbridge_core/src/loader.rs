//! Dynamic loading of the engine library.

use crate::config::EngineConfig;
use crate::error::{BindingError, BindingResult};
use libloading::Library;
use symbridge_abi::{
    symbols, ApproachFrom, DoubleTuple, EntityRef, ForeignEngine, LongTuple, MathFunction,
    NativeArray, NativeErrorCode,
};
use std::collections::HashMap;
use std::ffi::{c_char, CStr};
use tracing::{debug, trace};

type ParseFn = unsafe extern "C" fn(*const c_char, *mut EntityRef) -> NativeErrorCode;
type StringFn = unsafe extern "C" fn(EntityRef, *mut *mut c_char) -> NativeErrorCode;
type UnaryFn = unsafe extern "C" fn(EntityRef, *mut EntityRef) -> NativeErrorCode;
type BinaryFn = unsafe extern "C" fn(EntityRef, EntityRef, *mut EntityRef) -> NativeErrorCode;
type LimitFn = unsafe extern "C" fn(
    EntityRef,
    EntityRef,
    EntityRef,
    ApproachFrom,
    *mut EntityRef,
) -> NativeErrorCode;
type ArrayFn = unsafe extern "C" fn(EntityRef, *mut NativeArray) -> NativeErrorCode;
type LongFn = unsafe extern "C" fn(EntityRef, *mut i64) -> NativeErrorCode;
type RationalFn = unsafe extern "C" fn(EntityRef, *mut LongTuple) -> NativeErrorCode;
type DoubleFn = unsafe extern "C" fn(EntityRef, *mut f64) -> NativeErrorCode;
type ComplexFn = unsafe extern "C" fn(EntityRef, *mut DoubleTuple) -> NativeErrorCode;
type FreeEntityFn = unsafe extern "C" fn(EntityRef) -> NativeErrorCode;
type FreeArrayFn = unsafe extern "C" fn(NativeArray) -> NativeErrorCode;
type FreeErrorFn = unsafe extern "C" fn(NativeErrorCode) -> NativeErrorCode;
type FreeStringFn = unsafe extern "C" fn(*mut c_char) -> NativeErrorCode;

#[derive(Clone, Copy)]
enum FunctionExport {
    Unary(UnaryFn),
    Binary(BinaryFn),
}

/// Required exports, resolved once at load time.
struct Exports {
    free_entity: FreeEntityFn,
    free_native_array: FreeArrayFn,
    free_error_code: FreeErrorFn,
    free_string: FreeStringFn,
    maths_from_string: ParseFn,
    entity_to_string: StringFn,
    entity_latexise: StringFn,
    entity_differentiate: BinaryFn,
    entity_integrate: BinaryFn,
    entity_limit: LimitFn,
    entity_solve: BinaryFn,
    entity_solve_equation: BinaryFn,
    entity_simplify: UnaryFn,
    entity_evaled: UnaryFn,
    entity_inner_simplified: UnaryFn,
    entity_alternate: ArrayFn,
    op_entity_add: BinaryFn,
    op_entity_sub: BinaryFn,
    op_entity_mul: BinaryFn,
    op_entity_div: BinaryFn,
    entity_nodes: ArrayFn,
    entity_vars: ArrayFn,
    entity_vars_and_constants: ArrayFn,
    entity_direct_children: ArrayFn,
    entity_to_long: LongFn,
    entity_to_rational: RationalFn,
    entity_to_double: DoubleFn,
    entity_to_complex: ComplexFn,
}

/// An engine implemented by a dynamically loaded library.
///
/// Function pointers are resolved once at load time and stay valid for as
/// long as the library is loaded, which is the lifetime of this value.
pub struct DynamicEngine {
    exports: Exports,
    functions: HashMap<MathFunction, FunctionExport>,
    path: String,
    // Dropped last: unloads the library.
    _library: Library,
}

impl DynamicEngine {
    /// Loads the library described by `config` and resolves its exports.
    pub fn load(config: &EngineConfig) -> BindingResult<Self> {
        let target = config.resolve();
        let path = target.display().to_string();
        debug!(path = %path, "loading engine library");

        // SAFETY: loading runs the library's initialisers. The engine library
        // is trusted to be a conforming implementation of the ABI.
        let library = unsafe { Library::new(&target) }.map_err(|source| BindingError::Load {
            path: path.clone(),
            source,
        })?;

        let exports = resolve_exports(&library, &path)?;
        let functions = resolve_functions(&library, &path, config.require_functions)?;
        debug!(
            path = %path,
            functions = functions.len(),
            "engine library exports resolved"
        );

        Ok(Self {
            exports,
            functions,
            path,
            _library: library,
        })
    }

    /// Path or name the library was loaded from.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Resolves one symbol and copies the function pointer out.
///
/// # Safety
///
/// `T` must match the exported function's signature.
unsafe fn lookup<T: Copy>(
    library: &Library,
    path: &str,
    symbol: &'static str,
) -> BindingResult<T> {
    library
        .get::<T>(symbol.as_bytes())
        .map(|found| *found)
        .map_err(|source| BindingError::MissingSymbol {
            path: path.to_owned(),
            symbol,
            source,
        })
}

fn resolve_exports(library: &Library, path: &str) -> BindingResult<Exports> {
    // SAFETY: every alias matches the ABI signature of its symbol.
    unsafe {
        Ok(Exports {
            free_entity: lookup(library, path, symbols::FREE_ENTITY)?,
            free_native_array: lookup(library, path, symbols::FREE_NATIVE_ARRAY)?,
            free_error_code: lookup(library, path, symbols::FREE_ERROR_CODE)?,
            free_string: lookup(library, path, symbols::FREE_STRING)?,
            maths_from_string: lookup(library, path, symbols::MATHS_FROM_STRING)?,
            entity_to_string: lookup(library, path, symbols::ENTITY_TO_STRING)?,
            entity_latexise: lookup(library, path, symbols::ENTITY_LATEXISE)?,
            entity_differentiate: lookup(library, path, symbols::ENTITY_DIFFERENTIATE)?,
            entity_integrate: lookup(library, path, symbols::ENTITY_INTEGRATE)?,
            entity_limit: lookup(library, path, symbols::ENTITY_LIMIT)?,
            entity_solve: lookup(library, path, symbols::ENTITY_SOLVE)?,
            entity_solve_equation: lookup(library, path, symbols::ENTITY_SOLVE_EQUATION)?,
            entity_simplify: lookup(library, path, symbols::ENTITY_SIMPLIFY)?,
            entity_evaled: lookup(library, path, symbols::ENTITY_EVALED)?,
            entity_inner_simplified: lookup(library, path, symbols::ENTITY_INNER_SIMPLIFIED)?,
            entity_alternate: lookup(library, path, symbols::ENTITY_ALTERNATE)?,
            op_entity_add: lookup(library, path, symbols::OP_ENTITY_ADD)?,
            op_entity_sub: lookup(library, path, symbols::OP_ENTITY_SUB)?,
            op_entity_mul: lookup(library, path, symbols::OP_ENTITY_MUL)?,
            op_entity_div: lookup(library, path, symbols::OP_ENTITY_DIV)?,
            entity_nodes: lookup(library, path, symbols::ENTITY_NODES)?,
            entity_vars: lookup(library, path, symbols::ENTITY_VARS)?,
            entity_vars_and_constants: lookup(
                library,
                path,
                symbols::ENTITY_VARS_AND_CONSTANTS,
            )?,
            entity_direct_children: lookup(library, path, symbols::ENTITY_DIRECT_CHILDREN)?,
            entity_to_long: lookup(library, path, symbols::ENTITY_TO_LONG)?,
            entity_to_rational: lookup(library, path, symbols::ENTITY_TO_RATIONAL)?,
            entity_to_double: lookup(library, path, symbols::ENTITY_TO_DOUBLE)?,
            entity_to_complex: lookup(library, path, symbols::ENTITY_TO_COMPLEX)?,
        })
    }
}

fn resolve_functions(
    library: &Library,
    path: &str,
    required: bool,
) -> BindingResult<HashMap<MathFunction, FunctionExport>> {
    let mut functions = HashMap::with_capacity(MathFunction::ALL.len());
    for function in MathFunction::ALL {
        let symbol = function.symbol();
        // SAFETY: elementary functions take one or two handles and an out
        // handle, as given by their arity.
        let found = unsafe {
            if function.arity() == 2 {
                lookup::<BinaryFn>(library, path, symbol).map(FunctionExport::Binary)
            } else {
                lookup::<UnaryFn>(library, path, symbol).map(FunctionExport::Unary)
            }
        };
        match found {
            Ok(export) => {
                functions.insert(function, export);
            }
            Err(err) if required => return Err(err),
            Err(_) => trace!(symbol, "optional export not present"),
        }
    }
    Ok(functions)
}

impl ForeignEngine for DynamicEngine {
    fn maths_from_string(&self, text: &CStr, out: &mut EntityRef) -> NativeErrorCode {
        unsafe { (self.exports.maths_from_string)(text.as_ptr(), out) }
    }

    fn entity_to_string(&self, entity: EntityRef, out: &mut *mut c_char) -> NativeErrorCode {
        unsafe { (self.exports.entity_to_string)(entity, out) }
    }

    fn entity_latexise(&self, entity: EntityRef, out: &mut *mut c_char) -> NativeErrorCode {
        unsafe { (self.exports.entity_latexise)(entity, out) }
    }

    fn entity_differentiate(
        &self,
        entity: EntityRef,
        var: EntityRef,
        out: &mut EntityRef,
    ) -> NativeErrorCode {
        unsafe { (self.exports.entity_differentiate)(entity, var, out) }
    }

    fn entity_integrate(
        &self,
        entity: EntityRef,
        var: EntityRef,
        out: &mut EntityRef,
    ) -> NativeErrorCode {
        unsafe { (self.exports.entity_integrate)(entity, var, out) }
    }

    fn entity_limit(
        &self,
        entity: EntityRef,
        var: EntityRef,
        dest: EntityRef,
        from: ApproachFrom,
        out: &mut EntityRef,
    ) -> NativeErrorCode {
        unsafe { (self.exports.entity_limit)(entity, var, dest, from, out) }
    }

    fn entity_solve(
        &self,
        entity: EntityRef,
        var: EntityRef,
        out: &mut EntityRef,
    ) -> NativeErrorCode {
        unsafe { (self.exports.entity_solve)(entity, var, out) }
    }

    fn entity_solve_equation(
        &self,
        entity: EntityRef,
        var: EntityRef,
        out: &mut EntityRef,
    ) -> NativeErrorCode {
        unsafe { (self.exports.entity_solve_equation)(entity, var, out) }
    }

    fn entity_simplify(&self, entity: EntityRef, out: &mut EntityRef) -> NativeErrorCode {
        unsafe { (self.exports.entity_simplify)(entity, out) }
    }

    fn entity_evaled(&self, entity: EntityRef, out: &mut EntityRef) -> NativeErrorCode {
        unsafe { (self.exports.entity_evaled)(entity, out) }
    }

    fn entity_inner_simplified(&self, entity: EntityRef, out: &mut EntityRef) -> NativeErrorCode {
        unsafe { (self.exports.entity_inner_simplified)(entity, out) }
    }

    fn entity_alternate(&self, entity: EntityRef, out: &mut NativeArray) -> NativeErrorCode {
        unsafe { (self.exports.entity_alternate)(entity, out) }
    }

    fn op_entity_add(&self, a: EntityRef, b: EntityRef, out: &mut EntityRef) -> NativeErrorCode {
        unsafe { (self.exports.op_entity_add)(a, b, out) }
    }

    fn op_entity_sub(&self, a: EntityRef, b: EntityRef, out: &mut EntityRef) -> NativeErrorCode {
        unsafe { (self.exports.op_entity_sub)(a, b, out) }
    }

    fn op_entity_mul(&self, a: EntityRef, b: EntityRef, out: &mut EntityRef) -> NativeErrorCode {
        unsafe { (self.exports.op_entity_mul)(a, b, out) }
    }

    fn op_entity_div(&self, a: EntityRef, b: EntityRef, out: &mut EntityRef) -> NativeErrorCode {
        unsafe { (self.exports.op_entity_div)(a, b, out) }
    }

    fn entity_nodes(&self, entity: EntityRef, out: &mut NativeArray) -> NativeErrorCode {
        unsafe { (self.exports.entity_nodes)(entity, out) }
    }

    fn entity_vars(&self, entity: EntityRef, out: &mut NativeArray) -> NativeErrorCode {
        unsafe { (self.exports.entity_vars)(entity, out) }
    }

    fn entity_vars_and_constants(
        &self,
        entity: EntityRef,
        out: &mut NativeArray,
    ) -> NativeErrorCode {
        unsafe { (self.exports.entity_vars_and_constants)(entity, out) }
    }

    fn entity_direct_children(&self, entity: EntityRef, out: &mut NativeArray) -> NativeErrorCode {
        unsafe { (self.exports.entity_direct_children)(entity, out) }
    }

    fn entity_to_long(&self, entity: EntityRef, out: &mut i64) -> NativeErrorCode {
        unsafe { (self.exports.entity_to_long)(entity, out) }
    }

    fn entity_to_rational(&self, entity: EntityRef, out: &mut LongTuple) -> NativeErrorCode {
        unsafe { (self.exports.entity_to_rational)(entity, out) }
    }

    fn entity_to_double(&self, entity: EntityRef, out: &mut f64) -> NativeErrorCode {
        unsafe { (self.exports.entity_to_double)(entity, out) }
    }

    fn entity_to_complex(&self, entity: EntityRef, out: &mut DoubleTuple) -> NativeErrorCode {
        unsafe { (self.exports.entity_to_complex)(entity, out) }
    }

    fn has_function(&self, function: MathFunction) -> bool {
        self.functions.contains_key(&function)
    }

    fn math_function(
        &self,
        function: MathFunction,
        args: &[EntityRef],
        out: &mut EntityRef,
    ) -> Option<NativeErrorCode> {
        let export = self.functions.get(&function).copied()?;
        let code = match (export, args) {
            (FunctionExport::Unary(f), [x]) => unsafe { f(*x, out) },
            (FunctionExport::Binary(f), [a, b]) => unsafe { f(*a, *b, out) },
            _ => return None,
        };
        Some(code)
    }

    fn free_entity(&self, entity: EntityRef) -> NativeErrorCode {
        unsafe { (self.exports.free_entity)(entity) }
    }

    unsafe fn free_native_array(&self, array: NativeArray) -> NativeErrorCode {
        (self.exports.free_native_array)(array)
    }

    unsafe fn free_error_code(&self, error: NativeErrorCode) -> NativeErrorCode {
        (self.exports.free_error_code)(error)
    }

    unsafe fn free_string(&self, string: *mut c_char) -> NativeErrorCode {
        (self.exports.free_string)(string)
    }
}

impl std::fmt::Debug for DynamicEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicEngine")
            .field("path", &self.path)
            .field("functions", &self.functions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::platform_file_name;

    #[test]
    fn missing_library_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::new()
            .library_name("does_not_exist")
            .search_dir(dir.path());

        let err = DynamicEngine::load(&config).unwrap_err();
        match err {
            BindingError::Load { path, .. } => {
                assert!(path.ends_with(&platform_file_name("does_not_exist")));
            }
            other => panic!("expected a load error, got {other:?}"),
        }
    }

    #[test]
    fn non_library_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(platform_file_name("garbage"));
        std::fs::write(&path, b"definitely not a shared object").unwrap();

        let config = EngineConfig::new().library_path(&path);
        let err = DynamicEngine::load(&config).unwrap_err();
        assert!(matches!(err, BindingError::Load { .. }));
    }
}
