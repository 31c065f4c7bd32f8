//! Key Bindings
//!
//! A [`Keymap`] maps normalized key chords (`"Mod-Enter"`, `"Shift-Backspace"`, ...) to
//! [`Command`]s. [`Keymap::base`] builds the default editing bindings for an explicit
//! [`Platform`]; nothing is read from the environment unless the host asks for
//! [`Platform::current`].
//!
//! Key names are normalized before lookup: modifiers may be abbreviated (`c`, `a`, `s`, `m`)
//! and come in any order, `Mod` is `Meta` on macOS and `Ctrl` elsewhere, and `Space` is `" "`.
//!
//! Hosts can extend the defaults from their own configuration with [`KeymapConfig`], which
//! binds chords to chains of named commands.
//!
//! # Example
//!
//! ```rust
//! use richtext_commands::{EditorState, Keymap, Platform, Selection};
//! use richtext_model::{doc, p};
//!
//! let d = doc!(p!("one"), p!("<a>two"));
//! let a = d.tag("a");
//! let state = EditorState::with_selection(d.node, Selection::cursor(a));
//!
//! let keymap = Keymap::base(Platform { mac: false });
//! let tr = keymap.handle("Backspace", &state, None).unwrap();
//! assert_eq!(state.apply(tr).doc().child_count(), 1);
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::command::{Command, LayoutOracle, chain_commands};
use crate::commands;
use crate::state::EditorState;
use crate::transaction::Transaction;

/// Platform capabilities that change the default bindings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// macOS conventions: `Mod` is `Meta`, and Emacs-style control keys are bound.
    pub mac: bool,
}

impl Platform {
    /// The platform this binary was built for.
    pub fn current() -> Self {
        Self {
            mac: cfg!(target_os = "macos"),
        }
    }
}

/// Keymap configuration a host can load from its settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeymapConfig {
    /// Platform used for `Mod` and the platform-specific defaults.
    pub platform: Platform,
    /// Extra bindings: chord to the names of the commands to chain, tried in order.
    /// These replace default bindings for the same chord.
    pub bindings: BTreeMap<String, Vec<String>>,
}

/// Errors building a keymap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeymapError {
    /// A chord with no key.
    #[error("empty key name")]
    EmptyKey,
    /// A chord with an unrecognized modifier.
    #[error("unrecognized modifier `{modifier}` in key `{key}`")]
    UnknownModifier {
        /// The chord as written.
        key: String,
        /// The offending modifier.
        modifier: String,
    },
    /// A binding names a command that does not exist.
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    /// A binding lists no commands.
    #[error("no commands bound to `{0}`")]
    EmptyBinding(String),
}

/// Normalize a key chord to `Shift-Meta-Ctrl-Alt-key` order with full modifier names.
pub fn normalize_key(name: &str, platform: Platform) -> Result<String, KeymapError> {
    if name.is_empty() {
        return Err(KeymapError::EmptyKey);
    }
    // A trailing `-` is the minus key itself.
    let (mods, key) = match name.strip_suffix("--") {
        Some(mods) => (Some(mods), "-"),
        None if name == "-" => (None, "-"),
        None => match name.rsplit_once('-') {
            Some((mods, key)) => (Some(mods), key),
            None => (None, name),
        },
    };
    if key.is_empty() {
        return Err(KeymapError::EmptyKey);
    }
    let key = if key == "Space" { " " } else { key };

    let (mut alt, mut ctrl, mut meta, mut shift) = (false, false, false, false);
    for modifier in mods.into_iter().flat_map(|mods| mods.split('-')) {
        match modifier.to_ascii_lowercase().as_str() {
            "cmd" | "meta" | "m" => meta = true,
            "a" | "alt" => alt = true,
            "c" | "ctrl" | "control" => ctrl = true,
            "s" | "shift" => shift = true,
            "mod" if platform.mac => meta = true,
            "mod" => ctrl = true,
            _ => {
                return Err(KeymapError::UnknownModifier {
                    key: name.to_string(),
                    modifier: modifier.to_string(),
                });
            }
        }
    }

    let mut out = String::new();
    for (on, prefix) in [(shift, "Shift-"), (meta, "Meta-"), (ctrl, "Ctrl-"), (alt, "Alt-")] {
        if on {
            out.push_str(prefix);
        }
    }
    out.push_str(key);
    Ok(out)
}

/// Look up a primitive command by name.
pub fn command_by_name(name: &str) -> Option<Command> {
    type Primitive = fn(&EditorState, Option<&dyn LayoutOracle>) -> Option<Transaction>;
    let primitive: Primitive = match name {
        "delete_selection" => commands::delete_selection,
        "join_backward" => commands::join_backward,
        "join_forward" => commands::join_forward,
        "select_node_backward" => commands::select_node_backward,
        "select_node_forward" => commands::select_node_forward,
        "join_up" => commands::join_up,
        "join_down" => commands::join_down,
        "lift" => commands::lift,
        "split_block" => commands::split_block,
        "split_block_keep_marks" => commands::split_block_keep_marks,
        "lift_empty_block" => commands::lift_empty_block,
        "select_parent_node" => commands::select_parent_node,
        "select_all" => commands::select_all,
        "newline_in_code" => commands::newline_in_code,
        "exit_code" => commands::exit_code,
        "create_paragraph_near" => commands::create_paragraph_near,
        "select_textblock_start" => commands::select_textblock_start,
        "select_textblock_end" => commands::select_textblock_end,
        "delete_char_backward" => commands::delete_char_backward,
        "delete_char_forward" => commands::delete_char_forward,
        "delete_word_backward" => commands::delete_word_backward,
        "delete_word_forward" => commands::delete_word_forward,
        _ => return None,
    };
    Some(Command::new(name.to_string(), primitive))
}

fn named_chain(names: &[&str]) -> Command {
    chain_commands(names.iter().filter_map(|name| command_by_name(name)).collect())
}

/// Key chords bound to commands.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    platform: Platform,
    bindings: HashMap<String, Command>,
}

impl Keymap {
    /// An empty keymap.
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            bindings: HashMap::new(),
        }
    }

    /// The default editing bindings.
    pub fn base(platform: Platform) -> Self {
        let backspace = ["delete_selection", "join_backward", "select_node_backward"];
        let delete = ["delete_selection", "join_forward", "select_node_forward"];

        let enter = named_chain(&[
            "newline_in_code",
            "create_paragraph_near",
            "lift_empty_block",
            "split_block",
        ]);
        let del_back = named_chain(&[&backspace[..], &["delete_char_backward"][..]].concat());
        let del_word_back = named_chain(&[&backspace[..], &["delete_word_backward"][..]].concat());
        let del_fwd = named_chain(&[&delete[..], &["delete_char_forward"][..]].concat());
        let del_word_fwd = named_chain(&[&delete[..], &["delete_word_forward"][..]].concat());

        let mut keymap = Keymap::new(platform);
        let mut defaults: Vec<(&str, Command)> = vec![
            ("Enter", enter),
            ("Mod-Enter", named_chain(&["exit_code"])),
            ("Backspace", del_back.clone()),
            ("Mod-Backspace", del_word_back.clone()),
            ("Shift-Backspace", del_back.clone()),
            ("Delete", del_fwd.clone()),
            ("Mod-Delete", del_word_fwd.clone()),
            ("Alt-ArrowUp", named_chain(&["join_up"])),
            ("Alt-ArrowDown", named_chain(&["join_down"])),
            ("Mod-BracketLeft", named_chain(&["lift"])),
            ("Escape", named_chain(&["select_parent_node"])),
            ("Mod-a", named_chain(&["select_all"])),
        ];
        if platform.mac {
            defaults.extend([
                ("Ctrl-h", del_back),
                ("Alt-Backspace", del_word_back),
                ("Ctrl-d", del_fwd),
                ("Ctrl-Alt-Backspace", del_word_fwd.clone()),
                ("Alt-Delete", del_word_fwd.clone()),
                ("Alt-d", del_word_fwd),
                ("Ctrl-a", named_chain(&["select_textblock_start"])),
                ("Ctrl-e", named_chain(&["select_textblock_end"])),
            ]);
        }
        for (key, command) in defaults {
            if let Ok(key) = normalize_key(key, platform) {
                keymap.bindings.insert(key, command);
            }
        }
        keymap
    }

    /// The default bindings extended by `config`.
    pub fn from_config(config: &KeymapConfig) -> Result<Self, KeymapError> {
        let mut keymap = Keymap::base(config.platform);
        for (key, names) in &config.bindings {
            if names.is_empty() {
                return Err(KeymapError::EmptyBinding(key.clone()));
            }
            let commands = names
                .iter()
                .map(|name| {
                    command_by_name(name).ok_or_else(|| KeymapError::UnknownCommand(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            keymap.bind(key, chain_commands(commands))?;
        }
        Ok(keymap)
    }

    /// The platform the keymap normalizes `Mod` for.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Bind `key` to `command`, replacing any previous binding.
    pub fn bind(&mut self, key: &str, command: Command) -> Result<&mut Self, KeymapError> {
        let key = normalize_key(key, self.platform)?;
        self.bindings.insert(key, command);
        Ok(self)
    }

    /// The command bound to `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Command> {
        let key = normalize_key(key, self.platform).ok()?;
        self.bindings.get(&key)
    }

    /// Normalized chords with a binding.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Run the command bound to `key` against `state`.
    pub fn handle(
        &self,
        key: &str,
        state: &EditorState,
        view: Option<&dyn LayoutOracle>,
    ) -> Option<Transaction> {
        let command = self.get(key)?;
        let tr = command.check(state, view);
        if tr.is_some() {
            log::debug!("key {} handled by {}", key, command.name());
        }
        tr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PC: Platform = Platform { mac: false };
    const MAC: Platform = Platform { mac: true };

    #[test]
    fn test_normalize_modifiers() {
        assert_eq!(normalize_key("Mod-a", PC).unwrap(), "Ctrl-a");
        assert_eq!(normalize_key("Mod-a", MAC).unwrap(), "Meta-a");
        assert_eq!(normalize_key("alt-shift-x", PC).unwrap(), "Shift-Alt-x");
        assert_eq!(normalize_key("c-a-Backspace", PC).unwrap(), "Ctrl-Alt-Backspace");
        assert_eq!(normalize_key("Ctrl--", PC).unwrap(), "Ctrl--");
        assert_eq!(normalize_key("Space", PC).unwrap(), " ");
    }

    #[test]
    fn test_normalize_errors() {
        assert_eq!(normalize_key("", PC), Err(KeymapError::EmptyKey));
        assert!(matches!(
            normalize_key("Hyper-x", PC),
            Err(KeymapError::UnknownModifier { .. })
        ));
    }

    #[test]
    fn test_mac_only_bindings() {
        assert!(Keymap::base(MAC).get("Ctrl-h").is_some());
        assert!(Keymap::base(PC).get("Ctrl-h").is_none());
        assert!(Keymap::base(PC).get("Mod-BracketLeft").is_some());
        assert_eq!(
            Keymap::base(MAC).get("Cmd-a").map(Command::name),
            Some("select_all")
        );
    }

    #[test]
    fn test_config_rejects_unknown_command() {
        let mut config = KeymapConfig::default();
        config
            .bindings
            .insert("Mod-j".to_string(), vec!["teleport".to_string()]);
        assert_eq!(
            Keymap::from_config(&config).unwrap_err(),
            KeymapError::UnknownCommand("teleport".to_string())
        );
    }
}
