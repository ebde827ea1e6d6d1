use std::borrow::Cow;
use std::collections::HashSet;
use std::marker::PhantomData;

use anstyle::{Effects, Style};
use clap::{Command, CommandFactory};
use masm_emulator::runtime::{InstructionSet, RegisterFile};
use masm_emulator::TypeDescriptor;
use rustyline::{
    completion::Completer,
    highlight::Highlighter,
    hint::Hinter,
    validate::{ValidationContext, ValidationResult, Validator},
    Context,
};
use rustyline_derive::Helper;

/// Rustyline helper, that handles interactive completion, highlighting and hinting.
#[derive(Helper, Debug)]
pub(crate) struct RunHelper<T: CommandFactory> {
    app: PhantomData<T>,

    /// Operand and keyword suggestions, keyed by the argument they complete
    registers: Vec<String>,
    opcodes: Vec<String>,
    types: Vec<String>,
}

impl<T: CommandFactory> RunHelper<T> {
    pub fn new(registers: &RegisterFile, instructions: &InstructionSet) -> Self {
        RunHelper {
            app: PhantomData,
            registers: registers.names().map(|name| format!("%{name}")).collect(),
            opcodes: instructions.iter().map(|op| op.name().to_string()).collect(),
            types: TypeDescriptor::all().map(|kind| kind.word()).collect(),
        }
    }

    fn suggest(&self, command: &Command, input: &[String]) -> (usize, HashSet<String>) {
        // We're building the suggestions here
        // The only downside is that it's wasted work if we're not on the first word (second
        // pattern of the match bellow)
        let mut suggestions: HashSet<_> = command
            .get_subcommands()
            .flat_map(|cmd| {
                std::iter::once(cmd.get_name().to_string())
                    .chain(cmd.get_visible_aliases().map(ToString::to_string))
            })
            .collect();

        // If the app has subcommands, it has a `help` command
        if command.has_subcommands() {
            suggestions.insert("help".to_string());
        }

        let index = input.len().saturating_sub(1);

        // Find the corresponding positional arg if it exists and add suggestions for it
        if let Some(arg) = command.get_positionals().nth(index) {
            let additional: &[String] = match arg.get_id().as_str() {
                "register" | "target" | "source" => &self.registers,
                "opcode" => &self.opcodes,
                "kind" => &self.types,
                _ => &[],
            };

            suggestions.extend(additional.iter().cloned());
        }

        match input {
            [last] => (
                last.len(),
                suggestions
                    .into_iter()
                    .filter(|candidate| candidate.starts_with(last.as_str()))
                    .collect(),
            ),

            [head, tail @ ..] => command
                .find_subcommand(head)
                .map(|sub: &Command| self.suggest(sub, tail))
                .unwrap_or_default(),

            [] => (0, suggestions),
        }
    }

    /// Split the line up to the cursor into words, with an empty last word if the cursor is
    /// after a blank
    fn words(line: &str, pos: usize) -> Option<Vec<String>> {
        let line = line.get(..pos)?;
        let complete = line
            .bytes()
            .last()
            .filter(|&c| c == b' ' || c == b'\t')
            .is_some();
        let mut words = shell_words::split(line).ok()?;

        if complete {
            words.push(String::new());
        }

        Some(words)
    }
}

impl<T: CommandFactory> Completer for RunHelper<T> {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        let Some(words) = Self::words(line, pos) else {
            return Ok((0, Vec::new()));
        };

        let app = T::command();
        let (offset, candidates) = self.suggest(&app, words.as_slice());
        let mut candidates: Vec<_> = candidates.into_iter().collect();
        candidates.sort();

        Ok((pos - offset, candidates))
    }
}

impl<T: CommandFactory> Highlighter for RunHelper<T> {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        let style = Style::new().effects(Effects::DIMMED);
        Cow::Owned(format!("{style}{hint}{style:#}"))
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        let style = Style::new().bold();
        Cow::Owned(format!("{style}{prompt}{style:#}"))
    }
}

impl<T: CommandFactory> Hinter for RunHelper<T> {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let words = Self::words(line, pos)?;
        let app = T::command();
        let (offset, candidates) = self.suggest(&app, words.as_slice());

        if candidates.len() == 1 {
            candidates
                .into_iter()
                .next()
                .and_then(|candidate| candidate.get(offset..).map(ToString::to_string))
        } else {
            None
        }
    }
}

impl<T: CommandFactory> Validator for RunHelper<T> {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();
        let res = shell_words::split(input);
        if res.is_err() {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    #[command(no_binary_name = true)]
    enum Test {
        Push { source: String },
        Pop { target: String },
        Exec { opcode: String },
    }

    fn suggest(input: &[&str]) -> (usize, Vec<String>) {
        let helper: RunHelper<Test> =
            RunHelper::new(&RegisterFile::x86(), &InstructionSet::masm());
        let input: Vec<String> = input.iter().map(ToString::to_string).collect();
        let (offset, candidates) = helper.suggest(&Test::command(), &input);
        let mut candidates: Vec<_> = candidates.into_iter().collect();
        candidates.sort();
        (offset, candidates)
    }

    #[test]
    fn suggest_test() {
        assert_eq!(suggest(&["p"]), (1, vec!["pop".to_string(), "push".to_string()]));
        assert_eq!(
            suggest(&["push", "%a"]),
            (
                2,
                vec![
                    "%ah".to_string(),
                    "%al".to_string(),
                    "%ax".to_string()
                ]
            )
        );
        assert_eq!(suggest(&["exec", "MU"]), (2, vec!["MUL".to_string()]));
    }

    #[test]
    fn words_test() {
        assert_eq!(
            RunHelper::<Test>::words("push 1 ", 7),
            Some(vec!["push".to_string(), "1".to_string(), String::new()])
        );
        assert_eq!(RunHelper::<Test>::words("push \"x", 7), None);
    }
}
