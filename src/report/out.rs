// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tools for writing styled output.

use std::{borrow::Cow, io, str};

use clap::ValueEnum;
use console::{Style, Term};
use derive_more::with_trait::{Deref, DerefMut, Display, From, Into};
use either::Either;

/// Policy for coloring rendered output.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Coloring {
    /// Color only when a terminal is detected.
    Auto,

    /// Color even when no terminal is detected.
    Always,

    /// Never color.
    Never,
}

/// [`Style`]s for terminal output.
#[derive(Clone, Debug)]
pub struct Styles {
    /// [`Style`] for rendering successful outcomes.
    pub ok: Style,

    /// [`Style`] for rendering skipped work and inconclusive outcomes.
    pub skipped: Style,

    /// [`Style`] for rendering errors and failed outcomes.
    pub err: Style,

    /// [`Style`] for rendering headers.
    pub header: Style,

    /// [`Style`] for rendering __bold__.
    pub bold: Style,

    /// Indicates whether the terminal was detected.
    pub is_present: bool,
}

impl Default for Styles {
    fn default() -> Self {
        Self {
            ok: Style::new().green(),
            skipped: Style::new().cyan(),
            err: Style::new().red(),
            header: Style::new().blue(),
            bold: Style::new().bold(),
            is_present: console::user_attended() && console::colors_enabled(),
        }
    }
}

impl Styles {
    /// Creates new [`Styles`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the given [`Coloring`] to these [`Styles`].
    pub fn apply_coloring(&mut self, color: Coloring) {
        let colored = match color {
            Coloring::Always => true,
            Coloring::Never => false,
            Coloring::Auto => return,
        };
        console::set_colors_enabled(colored);
        self.is_present = colored;
    }

    /// If terminal is present colors `input` with [`Styles::ok`] color or
    /// leaves "as is" otherwise.
    #[must_use]
    pub fn ok<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        if self.is_present {
            self.ok.apply_to(input.into()).to_string().into()
        } else {
            input.into()
        }
    }

    /// If terminal is present colors `input` with [`Styles::skipped`] color or
    /// leaves "as is" otherwise.
    #[must_use]
    pub fn skipped<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        if self.is_present {
            self.skipped.apply_to(input.into()).to_string().into()
        } else {
            input.into()
        }
    }

    /// If terminal is present colors `input` with [`Styles::err`] color or
    /// leaves "as is" otherwise.
    #[must_use]
    pub fn err<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        if self.is_present {
            self.err.apply_to(input.into()).to_string().into()
        } else {
            input.into()
        }
    }

    /// If terminal is present colors `input` with [`Styles::header`] color or
    /// leaves "as is" otherwise.
    #[must_use]
    pub fn header<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        if self.is_present {
            self.header.apply_to(input.into()).to_string().into()
        } else {
            input.into()
        }
    }

    /// If terminal is present makes `input` __bold__ or leaves "as is"
    /// otherwise.
    #[must_use]
    pub fn bold<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        if self.is_present {
            self.bold.apply_to(input.into()).to_string().into()
        } else {
            input.into()
        }
    }

    /// Adds a plural `s` to `singular` when `num` calls for it, in bold.
    #[must_use]
    pub fn maybe_plural(
        &self,
        singular: impl Into<Cow<'static, str>>,
        num: usize,
    ) -> Cow<'static, str> {
        self.bold(format!(
            "{num} {}{}",
            singular.into(),
            if num == 1 { "" } else { "s" },
        ))
    }
}

/// [`io::Write`] extension for easier manipulation with strings.
pub trait WriteStrExt: io::Write {
    /// Writes the given `string` into this writer.
    ///
    /// # Errors
    ///
    /// If this writer fails to write the given `string`.
    fn write_str(&mut self, string: impl AsRef<str>) -> io::Result<()> {
        self.write(string.as_ref().as_bytes()).map(drop)
    }

    /// Writes the given `string` into this writer followed by a newline.
    ///
    /// # Errors
    ///
    /// If this writer fails to write the given `string`.
    fn write_line(&mut self, string: impl AsRef<str>) -> io::Result<()> {
        self.write_str(string.as_ref())
            .and_then(|()| self.write_str("\n"))
    }
}

impl<T: io::Write + ?Sized> WriteStrExt for T {}

/// [`String`] wrapper implementing [`io::Write`].
#[derive(
    Clone,
    Debug,
    Deref,
    DerefMut,
    Display,
    Eq,
    From,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
pub struct WritableString(pub String);

impl io::Write for WritableString {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.push_str(
            str::from_utf8(buf)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
        );
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Where rendered reports go: a real terminal, or an in-memory buffer.
#[derive(Debug)]
pub struct Output(Either<Term, WritableString>);

impl Output {
    /// [`Output`] bound to the standard output terminal.
    #[must_use]
    pub fn stdout() -> Self {
        Self(Either::Left(Term::stdout()))
    }

    /// [`Output`] collecting everything written into a [`String`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self(Either::Right(WritableString(String::new())))
    }

    /// Collected text, when this [`Output`] is in-memory.
    #[must_use]
    pub fn into_string(self) -> Option<String> {
        self.0.right().map(Into::into)
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_coloring_leaves_input_as_is() {
        let mut styles = Styles::new();
        styles.apply_coloring(Coloring::Never);

        assert_eq!(styles.ok("fine"), "fine");
        assert_eq!(styles.err("broken"), "broken");
        assert_eq!(styles.maybe_plural("scope", 2), "2 scopes");
        assert_eq!(styles.maybe_plural("scope", 1), "1 scope");
    }

    #[test]
    fn test_writable_string_collects_lines() {
        let mut out = WritableString(String::new());
        out.write_line("first").unwrap();
        out.write_str("second").unwrap();

        assert_eq!(out.0, "first\nsecond");
    }

    #[test]
    fn test_in_memory_output_round_trips() {
        let mut out = Output::in_memory();
        out.write_line("captured").unwrap();

        assert_eq!(out.into_string().as_deref(), Some("captured\n"));
    }

    #[test]
    fn test_terminal_output_has_no_buffer_to_collect() {
        assert_eq!(Output::stdout().into_string(), None);
    }
}
