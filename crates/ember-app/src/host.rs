//! Demo host: arithmetic commands and a `player` object bound through a
//! manifest.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::Result;

use ember_shell::{
    Binding, HostField, HostMethod, HostTable, Manifest, Param, Shell, ShellError, Value,
    ValueType,
};

const MANIFEST: &str = r#"
[[command]]
name = "heal"
method = "player.heal"
description = "Restore player health"

[[command]]
name = "teleport"
method = "player.teleport"
description = "Move the player"

[[command]]
name = "despawn"
method = "player.despawn"
description = "Remove the player from the world"

[[variable]]
name = "hp"
field = "player.health"
description = "Player health"

[[variable]]
name = "pos"
field = "player.position"
readonly = true
description = "Player position"

[[variable]]
name = "max_hp"
field = "player.max_health"
readonly = true
"#;

const MAX_HEALTH: i64 = 100;

/// A tiny stand-in for a host game object.
pub struct Player {
    alive: Cell<bool>,
    health: Cell<i64>,
    position: RefCell<[f64; 3]>,
}

impl Player {
    pub fn spawn() -> Rc<Self> {
        Rc::new(Self {
            alive: Cell::new(true),
            health: Cell::new(MAX_HEALTH),
            position: RefCell::new([0.0; 3]),
        })
    }
}

/// Bind the arithmetic commands and the player manifest.
pub fn bind_demo(shell: &Shell, player: &Rc<Player>) -> Result<()> {
    bind_arithmetic(shell)?;
    let manifest = Manifest::from_toml(MANIFEST)?;
    let count = shell.bind_manifest(&manifest, &player_table(player))?;
    log::info!("Demo host ready ({count} player bindings)");
    Ok(())
}

fn bind_arithmetic(shell: &Shell) -> Result<()> {
    let ops: [(&str, &str, fn(f64, f64) -> f64); 3] = [
        ("add", "Add two numbers", |a, b| a + b),
        ("sub", "Subtract b from a", |a, b| a - b),
        ("mul", "Multiply two numbers", |a, b| a * b),
    ];
    for (name, description, op) in ops {
        let binding = Binding::command(move |_, args| {
            Ok(Some(Value::Float(op(args.float(0)?, args.float(1)?))))
        })
        .param(Param::required("a", ValueType::Float))
        .param(Param::required("b", ValueType::Float))
        .description(description);
        shell.bind(name, binding)?;
    }
    Ok(())
}

fn player_table(player: &Rc<Player>) -> HostTable {
    let mut table = HostTable::new();

    let p = Rc::clone(player);
    table.add_object("player", move || p.alive.get());

    let p = Rc::clone(player);
    table.add_method(
        "player.heal",
        HostMethod::new(
            vec![Param::optional("amount", ValueType::Int).with_default(10)],
            move |_, args| {
                let health = (p.health.get() + args.int(0)?).clamp(0, MAX_HEALTH);
                p.health.set(health);
                Ok(Some(Value::Int(health)))
            },
        ),
    );

    let p = Rc::clone(player);
    table.add_method(
        "player.teleport",
        HostMethod::new(
            vec![Param::required("to", ValueType::Vec3)],
            move |_, args| {
                *p.position.borrow_mut() = args.vector::<3>(0)?;
                Ok(None)
            },
        ),
    );

    let p = Rc::clone(player);
    table.add_method(
        "player.despawn",
        HostMethod::new(Vec::new(), move |shell, _| {
            p.alive.set(false);
            shell.print("player despawned");
            Ok(None)
        }),
    );

    let (r, w) = (Rc::clone(player), Rc::clone(player));
    table.add_field(
        "player.health",
        HostField::new(
            ValueType::Int,
            move || Value::Int(r.health.get()),
            move |v| {
                let health = v
                    .as_int()
                    .ok_or_else(|| ShellError::Command("health must be an int".into()))?;
                w.health.set(health.clamp(0, MAX_HEALTH));
                Ok(())
            },
        ),
    );

    let p = Rc::clone(player);
    table.add_field(
        "player.position",
        HostField::constant(ValueType::Vec3, move || {
            Value::Vector(p.position.borrow().to_vec())
        }),
    );

    table.add_field(
        "player.max_health",
        HostField::constant(ValueType::Int, || Value::Int(MAX_HEALTH)),
    );

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_shell::ShellConfig;

    fn demo() -> (Shell, Rc<Player>) {
        let shell = Shell::new(ShellConfig::default());
        let player = Player::spawn();
        bind_demo(&shell, &player).unwrap();
        shell.drain_and_clear();
        (shell, player)
    }

    fn run(shell: &Shell, input: &str) -> Vec<String> {
        shell.eval(input);
        shell.drain_and_clear().into_iter().map(|l| l.text).collect()
    }

    #[test]
    fn arithmetic_nests() {
        let (shell, _) = demo();
        assert_eq!(run(&shell, "mul (add 1 2) (sub 5 1)"), vec!["12"]);
        assert_eq!(run(&shell, "add 0.5 0.25"), vec!["0.75"]);
    }

    #[test]
    fn player_members() {
        let (shell, player) = demo();
        assert_eq!(run(&shell, "hp 40; heal; heal 100; hp"), vec!["50", "100", "100"]);
        assert_eq!(run(&shell, "teleport (1, 2, 3); pos"), vec!["1, 2, 3"]);
        assert_eq!(*player.position.borrow(), [1.0, 2.0, 3.0]);
        assert_eq!(run(&shell, "max_hp"), vec!["100"]);
    }

    #[test]
    fn despawn_invalidates_members() {
        let (shell, _) = demo();
        assert_eq!(
            run(&shell, "despawn; hp"),
            vec![
                "player despawned",
                "'hp' is no longer valid and has been removed",
            ]
        );
        assert!(shell.lookup("heal").is_some());
        assert_eq!(
            run(&shell, "heal"),
            vec!["'heal' is no longer valid and has been removed"]
        );
    }
}
