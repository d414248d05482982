//! SQL clause readers shared by the usage patterns

use sqlparser::ast::{
    AssignmentTarget, Expr, FunctionArg, FunctionArgExpr, FunctionArguments, ObjectName,
    SelectItem, TableFactor, TableWithJoins,
};

use crate::usage::traits::ExtractError;

/// Render an object name as its unquoted parts joined with `.`.
pub fn object_name(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|part| match part.as_ident() {
            Some(ident) => ident.value.clone(),
            None => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Last identifier of an object name (`public.users.state` → `state`).
pub fn last_ident(name: &ObjectName) -> Option<String> {
    let part = name.0.last()?;
    Some(match part.as_ident() {
        Some(ident) => ident.value.clone(),
        None => part.to_string(),
    })
}

/// Extract table name from TableFactor
pub fn extract_table_from_factor(factor: &TableFactor) -> Result<String, ExtractError> {
    match factor {
        TableFactor::Table { name, .. } => Ok(object_name(name)),
        _ => Err(ExtractError::new("Complex table expression not supported")),
    }
}

/// The primary table of a FROM list. Joins are not enumerated.
pub fn extract_first_table(tables: &[TableWithJoins]) -> Result<String, ExtractError> {
    tables
        .first()
        .map(|t| extract_table_from_factor(&t.relation))
        .transpose()?
        .ok_or_else(|| ExtractError::new("No FROM clause found"))
}

/// Column named directly by an expression, looking through parentheses.
pub fn column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.clone()),
        Expr::CompoundIdentifier(parts) => Some(parts.last()?.value.clone()),
        Expr::Nested(inner) => column_name(inner),
        _ => None,
    }
}

/// Column behind a projected expression.
///
/// A bare column is used as is. A function applied to exactly one column is
/// unwrapped once (`lower(email)` → `email`). Anything else, including
/// nested calls and multi-argument calls, names no column.
pub fn resolve_column(expr: &Expr) -> Option<String> {
    if let Some(column) = column_name(expr) {
        return Some(column);
    }
    let Expr::Function(func) = expr else {
        return None;
    };
    let FunctionArguments::List(list) = &func.args else {
        return None;
    };
    match list.args.as_slice() {
        [only] => function_arg_expr(only).and_then(column_name),
        _ => None,
    }
}

/// Column behind one item of a SELECT list.
pub fn select_item_column(item: &SelectItem) -> Option<String> {
    match item {
        SelectItem::UnnamedExpr(expr) => resolve_column(expr),
        SelectItem::ExprWithAlias { expr, .. } => resolve_column(expr),
        _ => None,
    }
}

/// Extract the expression payload from a function argument.
pub fn function_arg_expr(arg: &FunctionArg) -> Option<&Expr> {
    match arg {
        FunctionArg::Unnamed(FunctionArgExpr::Expr(expr))
        | FunctionArg::Named {
            arg: FunctionArgExpr::Expr(expr),
            ..
        }
        | FunctionArg::ExprNamed {
            arg: FunctionArgExpr::Expr(expr),
            ..
        } => Some(expr),
        _ => None,
    }
}

/// Columns written by one SET assignment.
pub fn assignment_columns(target: &AssignmentTarget) -> Vec<String> {
    match target {
        AssignmentTarget::ColumnName(name) => last_ident(name).into_iter().collect(),
        AssignmentTarget::Tuple(names) => names.iter().filter_map(last_ident).collect(),
    }
}
