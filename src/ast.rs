use std::fmt::Display;

pub const PRINTLN: &str = "println";

/// Index of a [`Statement::FunctionDeclare`] in [`Program::statements`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclarationId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    FunctionDeclare(FunctionDeclare),
    FunctionCall(FunctionCall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclare {
    pub name: String,
    pub body: FunctionBody,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionBody {
    pub calls: Vec<FunctionCall>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Vec<String>,
    /// Set by the resolver. Always `None` for intrinsics.
    pub binding: Option<DeclarationId>,
}

impl Program {
    pub fn declaration(&self, id: DeclarationId) -> Option<&FunctionDeclare> {
        match self.statements.get(id.0) {
            Some(Statement::FunctionDeclare(declare)) => Some(declare),
            _ => None,
        }
    }

    pub fn declarations(&self) -> impl Iterator<Item = (DeclarationId, &FunctionDeclare)> {
        self.statements
            .iter()
            .enumerate()
            .filter_map(|(i, statement)| match statement {
                Statement::FunctionDeclare(declare) => Some((DeclarationId(i), declare)),
                Statement::FunctionCall(_) => None,
            })
    }
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            name: name.into(),
            arguments,
            binding: None,
        }
    }

    pub fn is_intrinsic(&self) -> bool {
        self.name == PRINTLN
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "program:")?;
        for statement in &self.statements {
            write!(f, "{}", statement)?;
        }
        Ok(())
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statement::FunctionDeclare(declare) => write!(f, "{}", declare),
            Statement::FunctionCall(call) => writeln!(f, "\t{}", call),
        }
    }
}

impl Display for FunctionDeclare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\tfunction declare: {}", self.name)?;
        write!(f, "{}", self.body)
    }
}

impl Display for FunctionBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for call in &self.calls {
            writeln!(f, "\t\t{}", call)?;
        }
        Ok(())
    }
}

impl Display for FunctionCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "function call: {}, parameters: {}",
            self.name,
            self.arguments.join(" ")
        )?;
        if let Some(DeclarationId(index)) = self.binding {
            write!(f, " -> statement[{}]", index)?;
        }
        Ok(())
    }
}
