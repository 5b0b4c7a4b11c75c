use std::{cell::RefCell, fmt::Debug, fmt::Display, rc::Rc};

use crate::ast::{DeclarationId, FunctionCall, Program, Statement};

/// Nested user-function calls allowed before execution stops with
/// [`ExecutionErrorKind::RecursionLimit`].
pub const DEFAULT_MAX_DEPTH: usize = 1024;

#[derive(Clone)]
pub struct Interpreter {
    stdout: Rc<RefCell<dyn std::io::Write>>,
    stderr: Rc<RefCell<dyn std::io::Write>>,
    max_depth: Option<usize>,
}

impl Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Rc::new(RefCell::new(std::io::stdout())))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Error executing {call} - {kind}")]
    Execution {
        kind: ExecutionErrorKind,
        call: FunctionCall,
        /// Warnings reported before execution stopped.
        warnings: Vec<Warning>,
    },
}

impl ExecutionError {
    pub fn kind(&self) -> &ExecutionErrorKind {
        match self {
            ExecutionError::Execution { kind, .. } => kind,
        }
    }

    pub fn warnings(&self) -> &[Warning] {
        match self {
            ExecutionError::Execution { warnings, .. } => warnings,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutionErrorKind {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Recursion limit of {limit} exceeded calling {name}")]
    RecursionLimit { name: String, limit: usize },
    #[error("Call to {name} is bound to statement {index}, which is not a function declaration")]
    InvalidBinding { name: String, index: usize },
}

/// A condition reported for one call that does not stop execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    NotDefined(String),
}

impl Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::NotDefined(name) => write!(f, "function {} not defined", name),
        }
    }
}

impl Interpreter {
    pub fn new(stdout: Rc<RefCell<dyn std::io::Write>>) -> Self {
        Self {
            stdout,
            stderr: Rc::new(RefCell::new(std::io::stderr())),
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }

    /// Sink for warnings. Each one is written when its call runs.
    pub fn with_stderr(mut self, stderr: Rc<RefCell<dyn std::io::Write>>) -> Self {
        self.stderr = stderr;
        self
    }

    /// `None` removes the guard; a runaway call chain then ends in stack overflow.
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Runs every top-level call in order. Declarations only run when called.
    ///
    /// Warnings are written to the stderr sink as they happen and also
    /// returned, or carried by the error when execution stops early.
    pub fn interpret(&mut self, program: &Program) -> Result<Vec<Warning>, ExecutionError> {
        let mut warnings = Vec::new();

        for statement in program.statements.iter() {
            let Statement::FunctionCall(call) = statement else {
                continue;
            };

            tracing::debug!(name = %call.name, "invoked");
            if let Err(kind) = self.call(program, call, 0, &mut warnings) {
                return Err(ExecutionError::Execution {
                    kind,
                    call: call.clone(),
                    warnings,
                });
            }
        }

        Ok(warnings)
    }

    fn call(
        &mut self,
        program: &Program,
        call: &FunctionCall,
        depth: usize,
        warnings: &mut Vec<Warning>,
    ) -> Result<(), ExecutionErrorKind> {
        if call.is_intrinsic() {
            return self.println(&call.arguments);
        }

        let Some(DeclarationId(index)) = call.binding else {
            let warning = Warning::NotDefined(call.name.clone());
            tracing::debug!(name = %call.name, "not defined");
            writeln!(self.stderr.borrow_mut(), "{}", warning)?;
            warnings.push(warning);
            return Ok(());
        };

        let Some(declare) = program.declaration(DeclarationId(index)) else {
            return Err(ExecutionErrorKind::InvalidBinding {
                name: call.name.clone(),
                index,
            });
        };

        if let Some(limit) = self.max_depth {
            if depth >= limit {
                return Err(ExecutionErrorKind::RecursionLimit {
                    name: call.name.clone(),
                    limit,
                });
            }
        }

        for inner in declare.body.calls.iter() {
            self.call(program, inner, depth + 1, warnings)?;
        }
        Ok(())
    }

    fn println(&mut self, arguments: &[String]) -> Result<(), ExecutionErrorKind> {
        writeln!(self.stdout.borrow_mut(), "{}", arguments.join(" "))?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ast::{FunctionBody, FunctionDeclare};

    fn call(name: &str, arguments: &[&str], binding: Option<usize>) -> FunctionCall {
        FunctionCall {
            name: name.to_string(),
            arguments: arguments.iter().map(|a| a.to_string()).collect(),
            binding: binding.map(DeclarationId),
        }
    }

    fn declare(name: &str, calls: Vec<FunctionCall>) -> Statement {
        Statement::FunctionDeclare(FunctionDeclare {
            name: name.to_string(),
            body: FunctionBody { calls },
        })
    }

    fn run(
        interpreter: Interpreter,
        program: &Program,
    ) -> (Result<Vec<Warning>, ExecutionError>, String) {
        let output = Rc::new(RefCell::new(Vec::<u8>::new()));
        let mut interpreter = Interpreter {
            stdout: output.clone(),
            stderr: Rc::new(RefCell::new(std::io::sink())),
            ..interpreter
        };
        let result = interpreter.interpret(program);
        let output = String::from_utf8(output.take()).unwrap();
        (result, output)
    }

    #[test]
    fn test_println_joins_arguments() {
        let program = Program {
            statements: vec![Statement::FunctionCall(call("println", &["a", "b c"], None))],
        };
        let (result, output) = run(Interpreter::default(), &program);
        assert!(result.unwrap().is_empty());
        assert_eq!(output, "a b c\n");
    }

    #[test]
    fn test_println_without_arguments_prints_blank_line() {
        let program = Program {
            statements: vec![Statement::FunctionCall(call("println", &[], None))],
        };
        let (_, output) = run(Interpreter::default(), &program);
        assert_eq!(output, "\n");
    }

    #[test]
    fn test_declarations_are_inert() {
        let program = Program {
            statements: vec![declare("never", vec![call("println", &["no"], None)])],
        };
        let (result, output) = run(Interpreter::default(), &program);
        assert!(result.unwrap().is_empty());
        assert_eq!(output, "");
    }

    #[test]
    fn test_not_defined_continues() {
        let program = Program {
            statements: vec![
                Statement::FunctionCall(call("missing", &[], None)),
                declare("inner", vec![call("alsoMissing", &[], None)]),
                Statement::FunctionCall(call("inner", &[], Some(1))),
                Statement::FunctionCall(call("println", &["after"], None)),
            ],
        };
        let (result, output) = run(Interpreter::default(), &program);
        assert_eq!(
            result.unwrap(),
            vec![
                Warning::NotDefined("missing".to_string()),
                Warning::NotDefined("alsoMissing".to_string()),
            ]
        );
        assert_eq!(output, "after\n");
    }

    #[test]
    fn test_warnings_are_written_when_the_call_runs() {
        let program = Program {
            statements: vec![
                Statement::FunctionCall(call("nowhere", &[], None)),
                Statement::FunctionCall(call("println", &["after"], None)),
                Statement::FunctionCall(call("alsoNowhere", &[], None)),
            ],
        };
        let console = Rc::new(RefCell::new(Vec::<u8>::new()));
        let warnings = Interpreter::new(console.clone())
            .with_stderr(console.clone())
            .interpret(&program)
            .unwrap();
        assert_eq!(
            String::from_utf8(console.take()).unwrap(),
            "function nowhere not defined\nafter\nfunction alsoNowhere not defined\n"
        );
        assert_eq!(
            warnings,
            vec![
                Warning::NotDefined("nowhere".to_string()),
                Warning::NotDefined("alsoNowhere".to_string()),
            ]
        );
    }

    #[test]
    fn test_error_keeps_earlier_warnings() {
        let program = Program {
            statements: vec![
                declare("forever", vec![call("forever", &[], Some(0))]),
                Statement::FunctionCall(call("missing", &[], None)),
                Statement::FunctionCall(call("forever", &[], Some(0))),
            ],
        };
        let (result, _) = run(Interpreter::default().with_max_depth(Some(4)), &program);
        let err = result.unwrap_err();
        assert!(matches!(
            err.kind(),
            ExecutionErrorKind::RecursionLimit { .. }
        ));
        assert_eq!(err.warnings(), &[Warning::NotDefined("missing".to_string())]);
    }

    #[test]
    fn test_warning_message() {
        assert_eq!(
            Warning::NotDefined("foo".to_string()).to_string(),
            "function foo not defined"
        );
    }

    #[test]
    fn test_nested_calls_run_in_order() {
        let program = Program {
            statements: vec![
                declare("leaf", vec![call("println", &["leaf"], None)]),
                declare(
                    "branch",
                    vec![
                        call("println", &["before"], None),
                        call("leaf", &[], Some(0)),
                        call("println", &["after"], None),
                    ],
                ),
                Statement::FunctionCall(call("branch", &[], Some(1))),
                Statement::FunctionCall(call("leaf", &[], Some(0))),
            ],
        };
        let (result, output) = run(Interpreter::default(), &program);
        assert!(result.is_ok());
        assert_eq!(output, "before\nleaf\nafter\nleaf\n");
    }

    #[test]
    fn test_recursion_limit() {
        let program = Program {
            statements: vec![
                declare(
                    "forever",
                    vec![call("println", &["tick"], None), call("forever", &[], Some(0))],
                ),
                Statement::FunctionCall(call("forever", &[], Some(0))),
                Statement::FunctionCall(call("println", &["unreached"], None)),
            ],
        };
        let (result, output) = run(Interpreter::default().with_max_depth(Some(3)), &program);
        let err = result.unwrap_err();
        assert!(matches!(
            err.kind(),
            ExecutionErrorKind::RecursionLimit { name, limit: 3 } if name == "forever"
        ));
        assert_eq!(output, "tick\ntick\ntick\n");
    }

    #[test]
    fn test_unguarded_depth() {
        let mut statements = Vec::new();
        for i in 0..50 {
            let next = if i == 49 {
                call("println", &["bottom"], None)
            } else {
                call(&format!("f{}", i + 1), &[], Some(i + 1))
            };
            statements.push(declare(&format!("f{i}"), vec![next]));
        }
        statements.push(Statement::FunctionCall(call("f0", &[], Some(0))));
        let program = Program { statements };

        let (result, _) = run(Interpreter::default().with_max_depth(Some(10)), &program);
        assert!(result.is_err());

        let (result, output) = run(Interpreter::default().with_max_depth(None), &program);
        assert!(result.is_ok());
        assert_eq!(output, "bottom\n");
    }

    #[test]
    fn test_invalid_binding() {
        let program = Program {
            statements: vec![Statement::FunctionCall(call("self", &[], Some(0)))],
        };
        let (result, _) = run(Interpreter::default(), &program);
        assert!(matches!(
            result.unwrap_err().kind(),
            ExecutionErrorKind::InvalidBinding { index: 0, .. }
        ));
    }
}
