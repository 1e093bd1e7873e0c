//! Built-in commands.
//!
//! Variadic commands (`echo`, `alias`) declare no parameters and read the
//! raw argument texts from the current call frame.

use std::cell::RefCell;
use std::rc::Rc;

use ember_types::error::{Result, ShellError};
use ember_types::output::Severity;
use ember_types::value::{Value, ValueType};

use crate::interpreter::Shell;
use crate::registry::{Args, Binding, BindingKind, Command, Param, quote_if_needed};

/// Register every built-in command with the shell.
pub fn register_builtins(shell: &Shell) {
    let commands: Vec<Box<dyn Command>> = vec![
        Box::new(PrintCmd),
        Box::new(EchoCmd),
        Box::new(WarnCmd),
        Box::new(HelpCmd),
        Box::new(WhichCmd),
        Box::new(AliasCmd),
        Box::new(UnaliasCmd),
        Box::new(VarCmd),
        Box::new(UnsetCmd),
        Box::new(IfCmd),
        Box::new(RepeatCmd),
        Box::new(ExecCmd),
        Box::new(EqCmd),
        Box::new(NotCmd),
    ];
    for cmd in commands {
        let name = cmd.name().to_string();
        if shell.register(cmd).is_err() {
            log::warn!("built-in '{name}' was not registered");
        }
    }
}

fn text_param(name: &str) -> Param {
    Param::required(name, ValueType::Text)
}

// ---------------------------------------------------------------------------
// print / echo / warn
// ---------------------------------------------------------------------------

struct PrintCmd;
impl Command for PrintCmd {
    fn name(&self) -> &str {
        "print"
    }
    fn description(&self) -> &str {
        "Print a value"
    }
    fn usage(&self) -> &str {
        "print <text>"
    }
    fn parameters(&self) -> Vec<Param> {
        vec![text_param("text")]
    }
    fn execute(&self, _shell: &Shell, args: &Args) -> Result<Option<Value>> {
        Ok(Some(Value::from(args.text(0)?)))
    }
}

struct EchoCmd;
impl Command for EchoCmd {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Print all arguments separated by spaces"
    }
    fn usage(&self) -> &str {
        "echo [args...]"
    }
    fn execute(&self, shell: &Shell, _args: &Args) -> Result<Option<Value>> {
        let frame = shell.current_frame()?;
        Ok(Some(Value::Text(frame.texts().join(" "))))
    }
}

struct WarnCmd;
impl Command for WarnCmd {
    fn name(&self) -> &str {
        "warn"
    }
    fn description(&self) -> &str {
        "Print a warning"
    }
    fn usage(&self) -> &str {
        "warn <text>"
    }
    fn parameters(&self) -> Vec<Param> {
        vec![text_param("text")]
    }
    fn execute(&self, shell: &Shell, args: &Args) -> Result<Option<Value>> {
        shell.emit(args.text(0)?, Severity::Warning);
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// help / which
// ---------------------------------------------------------------------------

struct HelpCmd;
impl Command for HelpCmd {
    fn name(&self) -> &str {
        "help"
    }
    fn description(&self) -> &str {
        "List commands or show help for one"
    }
    fn usage(&self) -> &str {
        "help [name]"
    }
    fn parameters(&self) -> Vec<Param> {
        vec![Param::optional("name", ValueType::Text)]
    }
    fn execute(&self, shell: &Shell, args: &Args) -> Result<Option<Value>> {
        if let Some(name) = args.get(0).and_then(Value::as_text) {
            let binding = shell
                .lookup(name)
                .ok_or_else(|| ShellError::UndefinedLocal(name.to_string()))?;
            shell.print(format!("usage: {}", binding.usage_text(name)));
            if let Some(desc) = binding.description_text() {
                shell.print(desc);
            }
            return Ok(None);
        }
        let bindings = shell.bindings();
        let width = bindings
            .iter()
            .map(|(name, b)| b.usage_text(name).len())
            .max()
            .unwrap_or(0);
        for (name, binding) in &bindings {
            let usage = binding.usage_text(name);
            match binding.description_text() {
                Some(desc) => shell.print(format!("  {usage:<width$}  {desc}")),
                None => shell.print(format!("  {usage}")),
            }
        }
        Ok(None)
    }
}

struct WhichCmd;
impl Command for WhichCmd {
    fn name(&self) -> &str {
        "which"
    }
    fn description(&self) -> &str {
        "Show what a name is bound to"
    }
    fn usage(&self) -> &str {
        "which <name>"
    }
    fn parameters(&self) -> Vec<Param> {
        vec![text_param("name")]
    }
    fn execute(&self, shell: &Shell, args: &Args) -> Result<Option<Value>> {
        let name = args.text(0)?;
        let binding = shell
            .lookup(name)
            .ok_or_else(|| ShellError::UndefinedLocal(name.to_string()))?;
        let text = match binding.alias_target() {
            Some(target) => format!("{name}: alias for '{target}'"),
            None => format!("{name}: {} ({})", binding.kind(), binding.usage_text(name)),
        };
        Ok(Some(Value::Text(text)))
    }
}

// ---------------------------------------------------------------------------
// alias / unalias
// ---------------------------------------------------------------------------

struct AliasCmd;
impl Command for AliasCmd {
    fn name(&self) -> &str {
        "alias"
    }
    fn description(&self) -> &str {
        "List aliases or define one"
    }
    fn usage(&self) -> &str {
        "alias [name] [target...]"
    }
    fn execute(&self, shell: &Shell, _args: &Args) -> Result<Option<Value>> {
        let frame = shell.current_frame()?;
        let texts = frame.texts();
        match texts.as_slice() {
            [] => {
                for (name, binding) in shell.bindings() {
                    if let Some(target) = binding.alias_target() {
                        shell.print(format!("alias {name} {}", quote_if_needed(target)));
                    }
                }
                Ok(None)
            },
            [name] => {
                let target = shell
                    .lookup(name)
                    .and_then(|b| b.alias_target().map(str::to_string))
                    .ok_or_else(|| ShellError::Command(format!("alias: '{name}' is not an alias")))?;
                Ok(Some(Value::Text(target)))
            },
            [name, target] => define_alias(shell, name, target.to_string()),
            [name, rest @ ..] => {
                let target: Vec<String> = rest.iter().map(|t| quote_if_needed(t)).collect();
                define_alias(shell, name, target.join(" "))
            },
        }
    }
}

fn define_alias(shell: &Shell, name: &str, target: String) -> Result<Option<Value>> {
    if let Some(existing) = shell.lookup(name) {
        if existing.kind() != BindingKind::Alias {
            return Err(ShellError::Command(format!(
                "alias: '{name}' is already bound as a {}",
                existing.kind()
            )));
        }
    }
    shell.bind(name, Binding::alias(target))?;
    Ok(None)
}

struct UnaliasCmd;
impl Command for UnaliasCmd {
    fn name(&self) -> &str {
        "unalias"
    }
    fn description(&self) -> &str {
        "Remove an alias"
    }
    fn usage(&self) -> &str {
        "unalias <name>"
    }
    fn parameters(&self) -> Vec<Param> {
        vec![text_param("name")]
    }
    fn execute(&self, shell: &Shell, args: &Args) -> Result<Option<Value>> {
        let name = args.text(0)?;
        remove_kind(shell, name, BindingKind::Alias)
    }
}

/// Remove `name` only if it is bound as `kind`.
fn remove_kind(shell: &Shell, name: &str, kind: BindingKind) -> Result<Option<Value>> {
    let binding = shell
        .lookup(name)
        .ok_or_else(|| ShellError::UndefinedLocal(name.to_string()))?;
    if binding.kind() != kind {
        return Err(ShellError::Command(format!(
            "cannot remove '{name}': it is a {}",
            binding.kind()
        )));
    }
    shell.unbind(name);
    Ok(None)
}

// ---------------------------------------------------------------------------
// var / unset
// ---------------------------------------------------------------------------

struct VarCmd;
impl Command for VarCmd {
    fn name(&self) -> &str {
        "var"
    }
    fn description(&self) -> &str {
        "Declare a text variable"
    }
    fn usage(&self) -> &str {
        "var <name> [value]"
    }
    fn parameters(&self) -> Vec<Param> {
        vec![
            text_param("name"),
            Param::optional("value", ValueType::Text).with_default(""),
        ]
    }
    fn execute(&self, shell: &Shell, args: &Args) -> Result<Option<Value>> {
        let name = args.text(0)?;
        let value = args.text(1)?;
        if let Some(existing) = shell.lookup(name) {
            if existing.kind() != BindingKind::Variable {
                return Err(ShellError::Command(format!(
                    "var: '{name}' is already bound as a {}",
                    existing.kind()
                )));
            }
        }
        let cell = Rc::new(RefCell::new(Value::from(value)));
        shell.bind(
            name,
            Binding::cell(ValueType::Text, cell).description("Shell variable"),
        )?;
        Ok(None)
    }
}

struct UnsetCmd;
impl Command for UnsetCmd {
    fn name(&self) -> &str {
        "unset"
    }
    fn description(&self) -> &str {
        "Remove a variable"
    }
    fn usage(&self) -> &str {
        "unset <name>"
    }
    fn parameters(&self) -> Vec<Param> {
        vec![text_param("name")]
    }
    fn execute(&self, shell: &Shell, args: &Args) -> Result<Option<Value>> {
        remove_kind(shell, args.text(0)?, BindingKind::Variable)
    }
}

// ---------------------------------------------------------------------------
// if / repeat / exec
// ---------------------------------------------------------------------------

struct IfCmd;
impl Command for IfCmd {
    fn name(&self) -> &str {
        "if"
    }
    fn description(&self) -> &str {
        "Evaluate a block when a condition holds"
    }
    fn usage(&self) -> &str {
        "if <condition> {then} [{else}]"
    }
    fn parameters(&self) -> Vec<Param> {
        vec![
            Param::required("condition", ValueType::Bool),
            text_param("then"),
            Param::optional("else", ValueType::Text),
        ]
    }
    fn execute(&self, shell: &Shell, args: &Args) -> Result<Option<Value>> {
        let block = if args.bool(0)? {
            Some(args.text(1)?)
        } else {
            args.get(2).and_then(Value::as_text)
        };
        if let Some(block) = block {
            shell.eval_block(block)?;
        }
        Ok(None)
    }
}

struct RepeatCmd;
impl Command for RepeatCmd {
    fn name(&self) -> &str {
        "repeat"
    }
    fn description(&self) -> &str {
        "Evaluate a block a number of times"
    }
    fn usage(&self) -> &str {
        "repeat <count> {block}"
    }
    fn parameters(&self) -> Vec<Param> {
        vec![Param::required("count", ValueType::Int), text_param("block")]
    }
    fn execute(&self, shell: &Shell, args: &Args) -> Result<Option<Value>> {
        let requested = usize::try_from(args.int(0)?).unwrap_or(0);
        let limit = shell.config().max_iterations;
        let count = if requested > limit {
            log::warn!("repeat count {requested} truncated to {limit}");
            shell.warn(format!("repeat: limited to {limit} iterations"));
            limit
        } else {
            requested
        };
        let block = args.text(1)?;
        for _ in 0..count {
            shell.eval_block(block)?;
        }
        Ok(None)
    }
}

struct ExecCmd;
impl Command for ExecCmd {
    fn name(&self) -> &str {
        "exec"
    }
    fn description(&self) -> &str {
        "Evaluate text as statements"
    }
    fn usage(&self) -> &str {
        "exec <text>"
    }
    fn parameters(&self) -> Vec<Param> {
        vec![text_param("text")]
    }
    fn execute(&self, shell: &Shell, args: &Args) -> Result<Option<Value>> {
        shell.eval_block(args.text(0)?)?;
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// eq / not
// ---------------------------------------------------------------------------

struct EqCmd;
impl Command for EqCmd {
    fn name(&self) -> &str {
        "eq"
    }
    fn description(&self) -> &str {
        "Compare two texts"
    }
    fn usage(&self) -> &str {
        "eq <a> <b>"
    }
    fn parameters(&self) -> Vec<Param> {
        vec![text_param("a"), text_param("b")]
    }
    fn execute(&self, _shell: &Shell, args: &Args) -> Result<Option<Value>> {
        Ok(Some(Value::Bool(args.text(0)? == args.text(1)?)))
    }
}

struct NotCmd;
impl Command for NotCmd {
    fn name(&self) -> &str {
        "not"
    }
    fn description(&self) -> &str {
        "Negate a bool"
    }
    fn usage(&self) -> &str {
        "not <bool>"
    }
    fn parameters(&self) -> Vec<Param> {
        vec![Param::required("value", ValueType::Bool)]
    }
    fn execute(&self, _shell: &Shell, args: &Args) -> Result<Option<Value>> {
        Ok(Some(Value::Bool(!args.bool(0)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_types::config::ShellConfig;
    use ember_types::output::Line;

    fn run(shell: &Shell, input: &str) -> (bool, Vec<Line>) {
        let ok = shell.eval(input);
        (ok, shell.drain_and_clear())
    }

    fn texts(lines: &[Line]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn all_builtins_registered() {
        let shell = Shell::default();
        for name in [
            "print", "echo", "warn", "help", "which", "alias", "unalias", "var", "unset", "if",
            "repeat", "exec", "eq", "not",
        ] {
            assert!(shell.lookup(name).is_some(), "{name}");
        }
    }

    #[test]
    fn builtins_can_be_disabled() {
        let shell = Shell::new(ShellConfig {
            builtins: false,
            ..ShellConfig::default()
        });
        assert!(shell.lookup("print").is_none());
    }

    #[test]
    fn print_and_echo() {
        let shell = Shell::default();
        let (ok, lines) = run(&shell, "print \"a;b\"; echo x   y \"z w\"");
        assert!(ok);
        assert_eq!(texts(&lines), vec!["a;b", "x y z w"]);
    }

    #[test]
    fn print_requires_argument() {
        let shell = Shell::default();
        let (ok, lines) = run(&shell, "print");
        assert!(!ok);
        assert_eq!(texts(&lines), vec!["print: missing required argument 0 (text)"]);
    }

    #[test]
    fn warn_severity() {
        let shell = Shell::default();
        let (ok, lines) = run(&shell, "warn careful");
        assert!(ok);
        assert_eq!(lines, vec![Line::new("careful", Severity::Warning)]);
    }

    #[test]
    fn help_lists_and_details() {
        let shell = Shell::default();
        let (ok, lines) = run(&shell, "help");
        assert!(ok);
        assert_eq!(lines.len(), 14);
        assert!(lines[0].text.trim_start().starts_with("alias"));

        let (ok, lines) = run(&shell, "help REPEAT");
        assert!(ok);
        assert_eq!(
            texts(&lines),
            vec!["usage: repeat <count> {block}", "Evaluate a block a number of times"]
        );

        let (ok, _) = run(&shell, "help nothing");
        assert!(!ok);
    }

    #[test]
    fn which_reports_kind() {
        let shell = Shell::default();
        let (_, lines) = run(&shell, "which print; var x 1; which x; alias p print; which p");
        assert_eq!(
            texts(&lines),
            vec![
                "print: command (print <text>)",
                "x: variable (x [value:text])",
                "p: alias for 'print'",
            ]
        );
    }

    #[test]
    fn alias_forwards_arguments() {
        let shell = Shell::default();
        let (ok, lines) = run(&shell, "alias say print; say \"hello world\"");
        assert!(ok);
        assert_eq!(texts(&lines), vec!["hello world"]);
    }

    #[test]
    fn alias_with_block_target() {
        let shell = Shell::default();
        let (ok, lines) = run(&shell, "alias twice {print a; print a}; twice");
        assert!(ok);
        assert_eq!(texts(&lines), vec!["a", "a"]);
    }

    #[test]
    fn alias_forwards_block_holding_quotes() {
        let shell = Shell::default();
        let (ok, lines) = run(&shell, "alias run exec; run {print \"a b\"}");
        assert!(ok);
        assert_eq!(texts(&lines), vec!["a b"]);
    }

    #[test]
    fn alias_listing_groups_quoted_target() {
        let shell = Shell::default();
        let (_, lines) = run(&shell, "alias hi {echo \"big world\"}; alias");
        assert_eq!(texts(&lines), vec!["alias hi {echo \"big world\"}"]);
    }

    #[test]
    fn alias_with_multiword_target() {
        let shell = Shell::default();
        let (ok, lines) = run(&shell, "alias hi echo hello \"big world\"; hi there; alias hi");
        assert!(ok);
        assert_eq!(
            texts(&lines),
            vec!["hello big world there", "echo hello \"big world\""]
        );
    }

    #[test]
    fn alias_listing() {
        let shell = Shell::default();
        let (_, lines) = run(&shell, "alias b print; alias a {echo 1 2}; alias");
        assert_eq!(texts(&lines), vec!["alias a \"echo 1 2\"", "alias b print"]);
    }

    #[test]
    fn alias_cannot_shadow_command() {
        let shell = Shell::default();
        let (ok, lines) = run(&shell, "alias print echo");
        assert!(!ok);
        assert_eq!(
            texts(&lines),
            vec!["alias: 'print' is already bound as a command"]
        );
    }

    #[test]
    fn unalias_only_removes_aliases() {
        let shell = Shell::default();
        assert!(shell.eval("alias p print; unalias P"));
        assert!(shell.lookup("p").is_none());
        let (ok, lines) = run(&shell, "unalias print");
        assert!(!ok);
        assert_eq!(texts(&lines), vec!["cannot remove 'print': it is a command"]);
    }

    #[test]
    fn var_get_set_and_reference() {
        let shell = Shell::default();
        let (ok, lines) = run(&shell, "var name bob; name; name alice; print :name");
        assert!(ok);
        assert_eq!(texts(&lines), vec!["bob", "alice"]);
    }

    #[test]
    fn var_defaults_to_empty() {
        let shell = Shell::default();
        let (ok, lines) = run(&shell, "var blank; blank");
        assert!(ok);
        assert_eq!(texts(&lines), vec![""]);
    }

    #[test]
    fn unset_removes_variable_only() {
        let shell = Shell::default();
        assert!(shell.eval("var x 1; unset x"));
        assert!(shell.lookup("x").is_none());
        assert!(!shell.eval("unset echo"));
    }

    #[test]
    fn if_branches() {
        let shell = Shell::default();
        let (ok, lines) = run(
            &shell,
            "if true {print yes} {print no}; if 0 {print yes} {print no}; if false {print yes}",
        );
        assert!(ok);
        assert_eq!(texts(&lines), vec!["yes", "no"]);
    }

    #[test]
    fn if_with_computed_condition() {
        let shell = Shell::default();
        let (ok, lines) = run(&shell, "var a x; if (eq :a x) {print same} {print different}");
        assert!(ok);
        assert_eq!(texts(&lines), vec!["same"]);
    }

    #[test]
    fn if_rejects_non_bool() {
        let shell = Shell::default();
        let (ok, lines) = run(&shell, "if maybe {print yes}");
        assert!(!ok);
        assert_eq!(
            texts(&lines),
            vec!["if: argument 0 (condition) expects bool: 'maybe' is not a valid bool"]
        );
    }

    #[test]
    fn repeat_runs_block() {
        let shell = Shell::default();
        let (ok, lines) = run(&shell, "repeat 3 {print x}; repeat -2 {print y}");
        assert!(ok);
        assert_eq!(texts(&lines), vec!["x", "x", "x"]);
    }

    #[test]
    fn repeat_is_capped() {
        let shell = Shell::new(ShellConfig {
            max_iterations: 2,
            ..ShellConfig::default()
        });
        let (ok, lines) = run(&shell, "repeat 5 {print x}");
        assert!(ok);
        assert_eq!(lines[0], Line::new("repeat: limited to 2 iterations", Severity::Warning));
        assert_eq!(texts(&lines[1..]), vec!["x", "x"]);
    }

    #[test]
    fn repeat_stops_on_failure() {
        let shell = Shell::default();
        let (ok, lines) = run(&shell, "repeat 3 {print x; bogus}");
        assert!(!ok);
        assert_eq!(
            texts(&lines),
            vec!["x", "undefined command or variable: bogus"]
        );
    }

    #[test]
    fn exec_evaluates_text() {
        let shell = Shell::default();
        let (ok, lines) = run(&shell, "exec {print 1; print 2}");
        assert!(ok);
        assert_eq!(texts(&lines), vec!["1", "2"]);
    }

    #[test]
    fn eq_and_not() {
        let shell = Shell::default();
        let (ok, lines) = run(&shell, "eq a a; eq a b; not true; not (eq a b)");
        assert!(ok);
        assert_eq!(texts(&lines), vec!["true", "false", "false", "true"]);
    }
}
