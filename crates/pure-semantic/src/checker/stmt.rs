//! Statement typing.

use pure_core::{SemanticError, Span};

use crate::ast::{Expr, Generator, HandleStmt, LoopStmt, Stmt, StmtKind, VariableDef};
use crate::types::{Position, Type, substitute};

use super::TypeChecker;

/// Member a non-plural collection is iterated through.
const CREATE_ITERATOR: &str = "createIterator";
/// Member of an iterator holding the current element.
const CURRENT_VALUE: &str = "currentValue";

impl TypeChecker<'_> {
    pub(crate) fn check_statement(&mut self, statement: &Stmt) {
        match &statement.kind {
            StmtKind::Expr(expr) => {
                self.check_expr(expr);
            }
            StmtKind::Variable(def) => self.check_variable_def(statement, def),
            StmtKind::Loop(loop_stmt) => self.check_loop(statement, loop_stmt),
            StmtKind::Break | StmtKind::Next => {}
            StmtKind::Return(value) => self.check_return(statement, value.as_ref()),
            StmtKind::Raise(value) => {
                let ty = self.check_expr(value);
                let error_type = self.model.builtins.error_type();
                if let (Some(ty), Some(error_type)) = (ty, error_type) {
                    self.check_assignable(&error_type, &ty, value.id, value.span);
                }
            }
            StmtKind::Handle(handle) => self.check_handle(handle),
        }
    }

    fn check_variable_def(&mut self, statement: &Stmt, def: &VariableDef) {
        let declared = def.ty.as_ref().and_then(|ty| self.resolve_type(ty));
        let value = def.value.as_ref().and_then(|value| {
            let ty = self.check_expr(value)?;
            Some((value, ty))
        });
        if let (Some(declared), Some((value, ty))) = (&declared, &value) {
            self.check_assignable(declared, ty, value.id, value.span);
        }

        let ty = declared.or_else(|| value.map(|(_, ty)| ty));
        if let Some(declaration) = self.declarations.value_of(statement.id) {
            self.model[declaration].ty = ty;
        }
    }

    fn check_loop(&mut self, statement: &Stmt, loop_stmt: &LoopStmt) {
        self.loops.push(statement.id);
        match &loop_stmt.generator {
            Some(Generator::While { condition, .. }) => {
                let ty = self.check_expr(condition);
                self.check_condition(ty.as_ref(), condition.id, condition.span);
            }
            Some(Generator::Over { collection, binding }) => {
                let element = self
                    .check_expr(collection)
                    .and_then(|ty| self.element_type(&ty, collection.span));
                if let Some(declaration) = binding.as_ref().and_then(|binding| self.declarations.value_of(binding.id)) {
                    self.model[declaration].ty = element;
                }
            }
            None => {}
        }
        self.check_block(&loop_stmt.body);
        self.loops.pop();
    }

    /// Type of the elements produced when iterating over a `collection`.
    fn element_type(&mut self, collection: &Type, span: Span) -> Option<Type> {
        if let Type::Plural(base) = collection {
            return Some((**base).clone());
        }
        let iterator = self
            .model
            .member_signatures(collection, CREATE_ITERATOR)
            .into_iter()
            .find(|(signature, _)| self.model[*signature].parameters.is_empty())
            .and_then(|(signature, substitution)| {
                let return_type = self.model[signature].return_type.as_ref()?;
                Some(substitute(return_type, &substitution, Position::Output))
            });
        let Some(iterator) = iterator else {
            self.report(SemanticError::NotFound {
                kind: "member".to_string(),
                name: CREATE_ITERATOR.to_string(),
                span,
            });
            return None;
        };
        match self.model.find_member(&iterator, CURRENT_VALUE) {
            Some((declaration, substitution)) => self.member_type(declaration, &substitution),
            None => {
                self.report(SemanticError::NotFound {
                    kind: "member".to_string(),
                    name: CURRENT_VALUE.to_string(),
                    span,
                });
                None
            }
        }
    }

    fn check_return(&mut self, statement: &Stmt, value: Option<&Expr>) {
        let ty = match value {
            Some(value) => self.check_expr(value),
            None => Some(Type::NOTHING),
        };
        let Some(ty) = ty else {
            return;
        };
        match self.context().return_type.clone() {
            Some(expected) => {
                let (node, span) = value.map_or((statement.id, statement.span), |value| (value.id, value.span));
                self.check_assignable(&expected, &ty, node, span);
            }
            None => self.context.returned.push(ty),
        }
    }

    fn check_handle(&mut self, handle: &HandleStmt) {
        self.check_block(&handle.main);
        for handler in &handle.handlers {
            let ty = self.resolve_type(&handler.ty);
            if let (Some(error_type), Some(ty)) = (self.model.builtins.error_type(), &ty) {
                self.check_assignable(&error_type, ty, handler.id, handler.ty.span);
            }
            if let Some(declaration) = handler.binding.as_ref().and_then(|binding| self.declarations.value_of(binding.id)) {
                self.model[declaration].ty = ty;
            }
            self.check_block(&handler.body);
        }
        if let Some(always) = &handle.always {
            self.check_block(always);
        }
    }
}
