use rustc_hash::FxHashMap;

use crate::ast::{DeclarationId, FunctionBody, FunctionCall, Program, Statement};

/// Binds call sites to top-level declarations.
///
/// All declarations are indexed before any call is visited, so calls may
/// appear before the function they name. When a name is declared more than
/// once, the first declaration in source order wins.
#[derive(Debug, Default)]
pub struct Resolver {
    declarations: FxHashMap<String, DeclarationId>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub bound: usize,
    pub intrinsic: usize,
    /// Names of calls left without a binding, in visit order.
    pub unbound: Vec<String>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.unbound.is_empty()
    }
}

impl Resolver {
    pub fn new() -> Resolver {
        Resolver::default()
    }

    pub fn resolve(&mut self, program: &mut Program) -> Resolution {
        self.declare_all(program);

        let mut resolution = Resolution::default();
        for statement in &mut program.statements {
            match statement {
                Statement::FunctionDeclare(declare) => {
                    self.resolve_body(&mut declare.body, &mut resolution)
                }
                Statement::FunctionCall(call) => self.resolve_call(call, &mut resolution),
            }
        }
        resolution
    }

    fn declare_all(&mut self, program: &Program) {
        self.declarations.clear();
        for (id, declare) in program.declarations() {
            self.declarations.entry(declare.name.clone()).or_insert(id);
        }
    }

    fn resolve_body(&self, body: &mut FunctionBody, resolution: &mut Resolution) {
        for call in &mut body.calls {
            tracing::trace!(name = %call.name, "visited");
            self.resolve_call(call, resolution);
        }
    }

    fn resolve_call(&self, call: &mut FunctionCall, resolution: &mut Resolution) {
        if call.is_intrinsic() {
            call.binding = None;
            resolution.intrinsic += 1;
            tracing::debug!(name = %call.name, "resolved as intrinsic");
            return;
        }

        call.binding = self.declarations.get(&call.name).copied();
        match call.binding {
            Some(DeclarationId(index)) => {
                resolution.bound += 1;
                tracing::debug!(name = %call.name, statement = index, "resolved");
            }
            None => {
                resolution.unbound.push(call.name.clone());
                tracing::debug!(name = %call.name, "no declaration found");
            }
        }
    }
}
