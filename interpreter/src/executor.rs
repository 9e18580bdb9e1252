use std::cell::RefCell;
use std::collections::HashSet;
use std::io::Write;
use std::rc::Rc;

use indexmap::IndexMap;
use minipy::ast::{BinaryOperator, Expr, FunctionDef, Module, Stmt, StmtKind, Target};

use crate::builtins::BuiltinTable;
use crate::error::{CompileError, ErrorKind, ExecError, RuntimeError};
use crate::evaluator_helpers::{
    binary_op, collect_items, delete_item, get_item, iterate, set_item,
};
use crate::namespace::{BUILTINS_KEY, Namespace};
use crate::runtime_value::{CallArgs, Function, LocalScope, RuntimeValue};

/// Deepest nesting of function calls before `RecursionError` is raised.
pub const MAX_CALL_DEPTH: usize = 1000;

/// Native stack a thread needs to run `exec` up to `MAX_CALL_DEPTH` and
/// `evaluator::MAX_DEPTH` without overflowing.
pub const STACK_SIZE: usize = 256 * 1024 * 1024;

/// Compiled, location-tagged source that can be executed against a namespace.
#[derive(Debug, Clone)]
pub struct CodeObject {
    /// `path:line` label used in error reports.
    pub location: String,
    pub module: Rc<Module>,
}

impl CodeObject {
    pub fn is_empty(&self) -> bool {
        self.module.is_empty()
    }
}

/// Compile source text into a code object labelled with `location`.
pub fn compile(source: &str, location: impl Into<String>) -> Result<CodeObject, CompileError> {
    let location = location.into();
    match minipy::parse(source) {
        Ok(module) => Ok(CodeObject {
            location,
            module: Rc::new(module),
        }),
        Err(error) => Err(CompileError { location, error }),
    }
}

/// Execute a code object with `namespace` as both its global and local scope.
///
/// Like the reference runtime, a `__builtins__` entry is injected into the
/// namespace when it is not already present; removing it afterwards is the
/// caller's business.
pub fn exec(
    code: &CodeObject,
    namespace: &mut Namespace,
    output: &mut dyn Write,
) -> Result<(), ExecError> {
    if !namespace.contains(BUILTINS_KEY) {
        namespace.set(BUILTINS_KEY, RuntimeValue::Builtins(BuiltinTable::shared()));
    }
    tracing::trace!(location = %code.location, statements = code.module.body.len(), "exec");
    let mut interpreter = Interpreter::new(namespace, output);
    for stmt in &code.module.body {
        interpreter
            .execute_statement(stmt)
            .map_err(|error| ExecError {
                location: code.location.clone(),
                line: stmt.line,
                error,
            })?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Interpreter state
// ---------------------------------------------------------------------------

/// Outcome of executing a statement.
pub(crate) enum Flow {
    Normal,
    Break,
    Continue,
    Return(RuntimeValue),
}

struct Frame {
    function: Rc<Function>,
    locals: LocalScope,
}

/// Executes statements against a global namespace, writing `print` output to
/// the supplied sink.
pub struct Interpreter<'a> {
    pub(crate) globals: &'a mut Namespace,
    pub(crate) output: &'a mut dyn Write,
    frames: Vec<Frame>,
    /// Current expression nesting, checked against `evaluator::MAX_DEPTH`.
    pub(crate) depth: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(globals: &'a mut Namespace, output: &'a mut dyn Write) -> Self {
        Interpreter {
            globals,
            output,
            frames: Vec::new(),
            depth: 0,
        }
    }

    /// Execute one top-level statement. The parser rejects
    /// `break`/`continue`/`return` outside their constructs, so the flow
    /// outcome is always normal here.
    pub fn execute_statement(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        self.execute(stmt)?;
        Ok(())
    }

    // ---- Names ----

    pub(crate) fn load_name(&self, name: &str) -> Result<RuntimeValue, RuntimeError> {
        if let Some(frame) = self.frames.last() {
            if frame.function.locals.contains(name) {
                return frame.locals.borrow().get(name).cloned().ok_or_else(|| {
                    RuntimeError::new(
                        ErrorKind::UnboundLocalError,
                        format!(
                            "cannot access local variable '{}' where it is not associated with a value",
                            name
                        ),
                    )
                });
            }
            if !frame.function.globals.contains(name) {
                for scope in frame.function.enclosing.iter().rev() {
                    if let Some(value) = scope.borrow().get(name) {
                        return Ok(value.clone());
                    }
                }
            }
        }
        if let Some(value) = self.globals.get(name) {
            return Ok(value.clone());
        }
        if let Some(RuntimeValue::Builtins(table)) = self.globals.get(BUILTINS_KEY) {
            if let Some(value) = table.get(name) {
                return Ok(value);
            }
        }
        Err(RuntimeError::name_error(name))
    }

    fn store_name(&mut self, name: &str, value: RuntimeValue) {
        match self.frames.last() {
            Some(frame) if !frame.function.globals.contains(name) => {
                frame.locals.borrow_mut().insert(name.to_string(), value);
            }
            _ => self.globals.set(name, value),
        }
    }

    fn delete_name(&mut self, name: &str) -> Result<(), RuntimeError> {
        let removed = match self.frames.last() {
            Some(frame) if !frame.function.globals.contains(name) => {
                frame.locals.borrow_mut().shift_remove(name)
            }
            _ => self.globals.remove(name),
        };
        removed.map(|_| ()).ok_or_else(|| RuntimeError::name_error(name))
    }

    fn assign(&mut self, target: &Target, value: RuntimeValue) -> Result<(), RuntimeError> {
        match target {
            Target::Name(name) => {
                self.store_name(name, value);
                Ok(())
            }
            Target::Subscript {
                value: container,
                index,
            } => {
                let container = self.evaluate(container)?;
                if matches!(index, Expr::Slice { .. }) {
                    return Err(RuntimeError::type_error("slice assignment is not supported"));
                }
                let index = self.evaluate(index)?;
                set_item(&container, &index, value)
            }
            Target::Tuple(targets) => {
                let items = collect_items(&value)?;
                if items.len() > targets.len() {
                    return Err(RuntimeError::value_error(format!(
                        "too many values to unpack (expected {})",
                        targets.len()
                    )));
                }
                if items.len() < targets.len() {
                    return Err(RuntimeError::value_error(format!(
                        "not enough values to unpack (expected {}, got {})",
                        targets.len(),
                        items.len()
                    )));
                }
                for (target, item) in targets.iter().zip(items) {
                    self.assign(target, item)?;
                }
                Ok(())
            }
        }
    }

    // ---- Statements ----

    pub(crate) fn execute_block(&mut self, body: &[Stmt]) -> Result<Flow, RuntimeError> {
        for stmt in body {
            match self.execute(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        self.execute_kind(&stmt.kind)
            .map_err(|err| err.at_line(stmt.line))
    }

    fn execute_kind(&mut self, kind: &StmtKind) -> Result<Flow, RuntimeError> {
        match kind {
            StmtKind::Expr(expr) => {
                self.evaluate(expr)?;
            }
            StmtKind::Assign { targets, value } => {
                let value = self.evaluate(value)?;
                for target in targets {
                    self.assign(target, value.clone())?;
                }
            }
            StmtKind::AugAssign {
                target,
                operator,
                value,
            } => self.execute_aug_assign(target, *operator, value)?,
            StmtKind::Pass | StmtKind::Global(_) => {}
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => RuntimeValue::None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::If { test, body, orelse } => {
                let branch = if self.evaluate(test)?.is_truthy() {
                    body
                } else {
                    orelse
                };
                return self.execute_block(branch);
            }
            StmtKind::While { test, body, orelse } => {
                while self.evaluate(test)?.is_truthy() {
                    match self.execute_block(body)? {
                        Flow::Break => return Ok(Flow::Normal),
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                return self.execute_block(orelse);
            }
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                let iterable = self.evaluate(iter)?;
                for item in iterate(&iterable)? {
                    self.assign(target, item)?;
                    match self.execute_block(body)? {
                        Flow::Break => return Ok(Flow::Normal),
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                return self.execute_block(orelse);
            }
            StmtKind::FunctionDef(def) => {
                let function = self.make_function(def)?;
                self.store_name(&def.name, function);
            }
            StmtKind::Delete(targets) => {
                for target in targets {
                    self.delete(target)?;
                }
            }
            StmtKind::Assert { test, message } => {
                if !self.evaluate(test)?.is_truthy() {
                    let message = match message {
                        Some(expr) => self.evaluate(expr)?.try_str()?,
                        None => String::new(),
                    };
                    return Err(RuntimeError::new(ErrorKind::AssertionError, message));
                }
            }
            StmtKind::Raise(value) => return Err(self.raise(value.as_ref())?),
        }
        Ok(Flow::Normal)
    }

    fn execute_aug_assign(
        &mut self,
        target: &Target,
        operator: BinaryOperator,
        value: &Expr,
    ) -> Result<(), RuntimeError> {
        match target {
            Target::Name(name) => {
                let current = self.load_name(name)?;
                let rhs = self.evaluate(value)?;
                let result = self.inplace_op(operator, current, rhs)?;
                self.store_name(name, result);
                Ok(())
            }
            Target::Subscript {
                value: container,
                index,
            } => {
                let container = self.evaluate(container)?;
                if matches!(index, Expr::Slice { .. }) {
                    return Err(RuntimeError::type_error("slice assignment is not supported"));
                }
                let index = self.evaluate(index)?;
                let current = get_item(&container, &index)?;
                let rhs = self.evaluate(value)?;
                let result = self.inplace_op(operator, current, rhs)?;
                set_item(&container, &index, result)
            }
            Target::Tuple(_) => Err(RuntimeError::type_error(
                "illegal expression for augmented assignment",
            )),
        }
    }

    /// `+=` extends lists in place; every other combination rebinds.
    fn inplace_op(
        &mut self,
        operator: BinaryOperator,
        current: RuntimeValue,
        rhs: RuntimeValue,
    ) -> Result<RuntimeValue, RuntimeError> {
        if let (BinaryOperator::Addition, RuntimeValue::List(items)) =
            (operator, &current)
        {
            let extra = collect_items(&rhs)?;
            items.borrow_mut().extend(extra);
            return Ok(current);
        }
        binary_op(operator, &current, &rhs)
    }

    fn delete(&mut self, target: &Target) -> Result<(), RuntimeError> {
        match target {
            Target::Name(name) => self.delete_name(name),
            Target::Subscript { value, index } => {
                let container = self.evaluate(value)?;
                let index = self.evaluate(index)?;
                delete_item(&container, &index)
            }
            Target::Tuple(targets) => {
                for target in targets {
                    self.delete(target)?;
                }
                Ok(())
            }
        }
    }

    /// Build the error a `raise` statement propagates.
    fn raise(&mut self, value: Option<&Expr>) -> Result<RuntimeError, RuntimeError> {
        let Some(expr) = value else {
            return Ok(RuntimeError::new(
                ErrorKind::RuntimeError,
                "No active exception to reraise",
            ));
        };
        match self.evaluate(expr)? {
            RuntimeValue::Exception(exc) => Ok(exc.to_error()),
            RuntimeValue::ExceptionType(kind) => Ok(RuntimeError::new(kind, "")),
            _ => Ok(RuntimeError::type_error(
                "exceptions must derive from BaseException",
            )),
        }
    }

    // ---- Functions ----

    pub(crate) fn make_function(
        &mut self,
        def: &Rc<FunctionDef>,
    ) -> Result<RuntimeValue, RuntimeError> {
        let defaults = def
            .params
            .iter()
            .map(|param| param.default.as_ref().map(|e| self.evaluate(e)).transpose())
            .collect::<Result<Vec<_>, _>>()?;

        let enclosing = match self.frames.last() {
            Some(frame) => {
                let mut scopes = frame.function.enclosing.clone();
                scopes.push(Rc::clone(&frame.locals));
                scopes
            }
            None => Vec::new(),
        };

        let mut locals: HashSet<String> = def.params.iter().map(|p| p.name.clone()).collect();
        let mut globals = HashSet::new();
        collect_bindings(&def.body, &mut locals, &mut globals);
        locals.retain(|name| !globals.contains(name));

        Ok(RuntimeValue::Function(Rc::new(Function {
            def: Rc::clone(def),
            defaults,
            enclosing,
            locals,
            globals,
        })))
    }

    pub(crate) fn call_function(
        &mut self,
        function: &Rc<Function>,
        args: CallArgs,
    ) -> Result<RuntimeValue, RuntimeError> {
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(RuntimeError::new(
                ErrorKind::RecursionError,
                "maximum recursion depth exceeded",
            ));
        }
        let locals = bind_arguments(function, args)?;
        self.frames.push(Frame {
            function: Rc::clone(function),
            locals: Rc::new(RefCell::new(locals)),
        });
        let result = self.execute_block(&function.def.body);
        self.frames.pop();
        match result? {
            Flow::Return(value) => Ok(value),
            _ => Ok(RuntimeValue::None),
        }
    }
}

/// Match call arguments to parameters, filling in defaults.
fn bind_arguments(
    function: &Function,
    args: CallArgs,
) -> Result<IndexMap<String, RuntimeValue>, RuntimeError> {
    let def = &function.def;
    let params = &def.params;
    if args.positional.len() > params.len() {
        return Err(RuntimeError::type_error(format!(
            "{}() takes {} positional argument{} but {} {} given",
            def.name,
            params.len(),
            if params.len() == 1 { "" } else { "s" },
            args.positional.len(),
            if args.positional.len() == 1 { "was" } else { "were" }
        )));
    }

    let mut slots: Vec<Option<RuntimeValue>> = vec![None; params.len()];
    for (slot, value) in slots.iter_mut().zip(args.positional) {
        *slot = Some(value);
    }
    for (name, value) in args.keywords {
        let Some(index) = params.iter().position(|p| p.name == name) else {
            return Err(RuntimeError::type_error(format!(
                "{}() got an unexpected keyword argument '{}'",
                def.name, name
            )));
        };
        if slots[index].is_some() {
            return Err(RuntimeError::type_error(format!(
                "{}() got multiple values for argument '{}'",
                def.name, name
            )));
        }
        slots[index] = Some(value);
    }

    let mut locals = IndexMap::with_capacity(params.len());
    for ((param, slot), default) in params.iter().zip(slots).zip(&function.defaults) {
        let value = slot.or_else(|| default.clone()).ok_or_else(|| {
            RuntimeError::type_error(format!(
                "{}() missing required argument: '{}'",
                def.name, param.name
            ))
        })?;
        locals.insert(param.name.clone(), value);
    }
    Ok(locals)
}

/// Collect the names a function body binds and the names it declares global.
/// Nested function bodies are not entered; only their names are bound.
fn collect_bindings(body: &[Stmt], locals: &mut HashSet<String>, globals: &mut HashSet<String>) {
    fn target_names(target: &Target, locals: &mut HashSet<String>) {
        match target {
            Target::Name(name) => {
                locals.insert(name.clone());
            }
            Target::Tuple(targets) => {
                for target in targets {
                    target_names(target, locals);
                }
            }
            Target::Subscript { .. } => {}
        }
    }

    for stmt in body {
        match &stmt.kind {
            StmtKind::Assign { targets, .. } => {
                for target in targets {
                    target_names(target, locals);
                }
            }
            StmtKind::AugAssign { target, .. } => target_names(target, locals),
            StmtKind::Delete(targets) => {
                for target in targets {
                    target_names(target, locals);
                }
            }
            StmtKind::For {
                target,
                body,
                orelse,
                ..
            } => {
                target_names(target, locals);
                collect_bindings(body, locals, globals);
                collect_bindings(orelse, locals, globals);
            }
            StmtKind::If { body, orelse, .. } | StmtKind::While { body, orelse, .. } => {
                collect_bindings(body, locals, globals);
                collect_bindings(orelse, locals, globals);
            }
            StmtKind::FunctionDef(def) => {
                locals.insert(def.name.clone());
            }
            StmtKind::Global(names) => globals.extend(names.iter().cloned()),
            _ => {}
        }
    }
}
