/// Available `:` commands and autocomplete logic

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

pub const COMMANDS: &[Command] = &[
  Command {
    name: "stacks",
    aliases: &["s", "list", "home"],
    description: "Back to the stack list",
  },
  Command {
    name: "new",
    aliases: &["n", "create", "add"],
    description: "Create a stack",
  },
  Command {
    name: "refresh",
    aliases: &["r", "reload"],
    description: "Refetch the stack list",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit stackdeck",
  },
];

/// Look a command up by exact name or alias
pub fn find(input: &str) -> Option<&'static Command> {
  let input = input.trim().to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == input || cmd.aliases.contains(&input.as_str()))
}

/// Autocomplete suggestions, best match first.
///
/// Ranking: exact name, exact alias, name prefix, alias prefix, name
/// substring, alias substring.
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();
  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&'static Command, u8)> = COMMANDS
    .iter()
    .filter_map(|cmd| rank(cmd, &input).map(|r| (cmd, r)))
    .collect();
  // Stable sort keeps table order within a rank
  matches.sort_by_key(|(_, r)| *r);
  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

fn rank(cmd: &Command, input: &str) -> Option<u8> {
  let any_alias = |f: fn(&str, &str) -> bool| cmd.aliases.iter().any(|&a| f(a, input));

  if cmd.name == input {
    Some(0)
  } else if any_alias(|a, i| a == i) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if any_alias(|a, i| a.starts_with(i)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if any_alias(|a, i| a.contains(i)) {
    Some(5)
  } else {
    None
  }
}
