//! Template rendering: finds `<[ ... ]>` fragments in authored text and
//! substitutes each with the stringified result of evaluating it under the
//! legacy expression grammar (`adventure_parser`/`adventure_ast`).

use crate::error::EngineError;
use crate::value::ScriptValue;
use crate::vm::ScriptVm;
use adventure_ast::{Call, Expr, ExprKind, ExprList, Value};
use regex::Regex;
use std::sync::OnceLock;

fn fragment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<\[(.*?)\]>").expect("fragment pattern is valid"))
}

/// Renders `template`, replacing every `<[ ... ]>` fragment with its
/// evaluated, stringified value. Fragments are matched against the
/// original text only, in document order — a rendered value that itself
/// contains `<[`/`]>` is never re-scanned.
pub fn render(template: &str, vm: &ScriptVm) -> Result<String, EngineError> {
    let pattern = fragment_pattern();
    let mut output = String::with_capacity(template.len());
    let mut last_end = 0;
    for captures in pattern.captures_iter(template) {
        let whole = captures.get(0).expect("group 0 always matches");
        let body = captures.get(1).expect("capture group 1 is the fragment body").as_str();
        output.push_str(&template[last_end..whole.start()]);

        let list = adventure_parser::parse_expr_list(body)?;
        let value = eval_expr_list(&list, vm)?;
        output.push_str(&value.to_lua_string());

        last_end = whole.end();
    }
    output.push_str(&template[last_end..]);
    Ok(output)
}

/// Evaluates a full sequence, returning the value of its last expression.
/// Every expression in the sequence runs, in order, for its side effects.
pub(crate) fn eval_expr_list(list: &ExprList, vm: &ScriptVm) -> Result<ScriptValue, EngineError> {
    let mut value = ScriptValue::Null;
    for expr in list.exprs() {
        value = eval_expr(expr, vm)?;
    }
    Ok(value)
}

pub(crate) fn eval_expr(expr: &Expr, vm: &ScriptVm) -> Result<ScriptValue, EngineError> {
    match &expr.kind {
        ExprKind::Value(Value::Str(s) | Value::RawStr(s)) => Ok(ScriptValue::String(s.clone())),
        ExprKind::Value(Value::Num(n)) => Ok(ScriptValue::Number(*n)),
        ExprKind::Value(Value::ScalarRef(name)) => Ok(vm.read_scalar(name)?),
        ExprKind::Call(call) => eval_call(call, vm),
        ExprKind::ScalarAssign(assign) => {
            let value = eval_expr(&assign.value, vm)?;
            vm.write_scalar(&assign.name, value.clone())?;
            Ok(value)
        }
    }
}

/// Evaluates a bare `call` node — shared by fragment evaluation and the
/// legacy interactive-mode action dispatch (`Engine::eval_action_call`).
pub(crate) fn eval_call(call: &Call, vm: &ScriptVm) -> Result<ScriptValue, EngineError> {
    let mut args = Vec::with_capacity(call.args.len());
    for arg in &call.args {
        args.push(eval_expr(arg, vm)?);
    }
    Ok(vm.call_global(&call.name, args)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_pure_literal() {
        let vm = ScriptVm::new(|_| {}).unwrap();
        assert_eq!(render(r#"hello <[ "world" ]>!"#, &vm).unwrap(), "hello world!");
    }

    #[test]
    fn scalar_ref_defaults_to_nil() {
        let vm = ScriptVm::new(|_| {}).unwrap();
        assert_eq!(render("X=<[ $missing ]>", &vm).unwrap(), "X=nil");
    }

    #[test]
    fn assignment_is_observable_by_a_later_fragment() {
        let vm = ScriptVm::new(|_| {}).unwrap();
        let out = render("<[ x = 42 ]> then <[ $x ]>", &vm).unwrap();
        assert_eq!(out, "42 then 42");
    }

    #[test]
    fn sequence_yields_last_value() {
        let vm = ScriptVm::new(|_| {}).unwrap();
        assert_eq!(render("<[ 1; 2; 3 ]>", &vm).unwrap(), "3");
    }

    #[test]
    fn text_without_fragments_is_unchanged() {
        let vm = ScriptVm::new(|_| {}).unwrap();
        let text = "no fragments here, just prose.";
        assert_eq!(render(text, &vm).unwrap(), text);
    }

    #[test]
    fn rendered_delimiters_are_not_rescanned() {
        // The first fragment's value contains a literal "<[", which would
        // look like the start of a new fragment if the renderer re-scanned
        // its own output. It doesn't: matches are taken from the original
        // template only, so the second fragment still renders normally.
        let vm = ScriptVm::new(|_| {}).unwrap();
        let out = render(r#"<[ "<[" ]> done <[ 2 ]>"#, &vm).unwrap();
        assert_eq!(out, "<[ done 2");
    }

    #[test]
    fn whitespace_only_fragment_is_a_parse_error() {
        let vm = ScriptVm::new(|_| {}).unwrap();
        assert!(matches!(render("<[   ]>", &vm), Err(EngineError::Parse(_))));
    }
}
