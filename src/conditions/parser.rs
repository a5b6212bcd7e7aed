//! rules file parser - converts indentation-structured text into rules
//!
//! ```text
//! wake 00:24:1d:d9:fa:09 192.168.1.101:
//!     10:00 < now < 12:00
//!     inactivity 10 min
//!     hold off 5 min
//!     now not Sat Sun
//!     any:
//!         now Mon
//!         inactivity 1 hour
//! ```
//!
//! structure comes from indentation alone. the parser keeps a stack of
//! known indentation columns (starting at column 0) and classifies every
//! line against its top:
//! - same column: a peer of the current block
//! - deeper, right after a block header: an indent, the column is pushed
//! - shallower and at or below the enclosing column: an unindent, popped
//! - anything else: illegal nesting, which aborts the parse
//!
//! each grammar alternative reports either a mismatch ("not this kind of
//! clause", the next alternative is tried) or a fatal error ("this kind of
//! clause, but malformed"), which aborts the parse.

use std::net::IpAddr;

use thiserror::Error;

use super::time::{closest, parse_time, parse_weekday, suggest_weekday, unit_names, unit_seconds};
use super::types::{Condition, Host, MacAddress, Node, When};
use crate::rules::{ConfigurationError, Rule, RuleArg, RuleRegistry};

const CLAUSE_KEYWORDS: [&str; 6] = ["inactivity", "hold", "now", "all:", "any:", "not:"];

/// error type for parsing rules
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// malformed input, the whole parse is aborted
    #[error("line {line}, column {column}: {message}")]
    Fatal {
        line: usize,
        column: usize,
        message: String,
    },

    /// the input is not the construct that was tried here
    #[error("line {line}, column {column}: {message}")]
    Mismatch {
        line: usize,
        column: usize,
        message: String,
    },

    /// the clauses of a block don't add up to a valid rule or group
    #[error("line {line}: {source}")]
    Configuration {
        line: usize,
        #[source]
        source: ConfigurationError,
    },
}

impl ParseError {
    /// whether this error must abort the parse rather than let another alternative be tried
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ParseError::Mismatch { .. })
    }

    /// 1-based line number the error refers to
    pub fn line(&self) -> usize {
        match self {
            ParseError::Fatal { line, .. }
            | ParseError::Mismatch { line, .. }
            | ParseError::Configuration { line, .. } => *line,
        }
    }

    fn into_fatal(self) -> Self {
        match self {
            ParseError::Mismatch {
                line,
                column,
                message,
            } => ParseError::Fatal {
                line,
                column,
                message,
            },
            other => other,
        }
    }
}

/// one significant line of input
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    /// 1-based line number
    number: usize,
    /// count of leading spaces
    indent: usize,
    /// content with indentation, comment and trailing whitespace removed
    text: &'a str,
}

impl<'a> Line<'a> {
    fn words(&self) -> Vec<&'a str> {
        self.text.split_whitespace().collect()
    }

    /// 1-based column of `part`, which must be a slice of this line's text
    fn column_of(&self, part: &str) -> usize {
        let start = self.text.as_ptr() as usize;
        let offset = (part.as_ptr() as usize)
            .checked_sub(start)
            .filter(|o| *o <= self.text.len())
            .unwrap_or(0);
        self.indent + offset + 1
    }

    fn fatal(&self, part: &str, message: impl Into<String>) -> ParseError {
        ParseError::Fatal {
            line: self.number,
            column: self.column_of(part),
            message: message.into(),
        }
    }

    fn mismatch(&self, message: impl Into<String>) -> ParseError {
        ParseError::Mismatch {
            line: self.number,
            column: self.indent + 1,
            message: message.into(),
        }
    }
}

/// a parsed clause of a block body
#[derive(Debug)]
enum Clause {
    Node(Node<Condition>),
    HoldOff(u64),
}

type Alternative<'a> = fn(&mut Parser<'a>, Line<'a>) -> Result<Clause, ParseError>;

/// parse rules text into rules, in source order
pub fn parse_rules(text: &str) -> Result<Vec<Rule>, ParseError> {
    Parser::new(text)?.parse()
}

/// parse rules text and add every rule to `registry`
///
/// nothing is added unless the whole text parses.
pub fn load_rules(text: &str, registry: &mut RuleRegistry) -> Result<usize, ParseError> {
    let rules = parse_rules(text)?;
    let count = rules.len();
    for rule in rules {
        registry.add(rule);
    }
    Ok(count)
}

/// single-use parser state; the indentation stack lives and dies with it
pub struct Parser<'a> {
    lines: Vec<Line<'a>>,
    pos: usize,
    indent_stack: Vec<usize>,
}

impl<'a> Parser<'a> {
    pub fn new(text: &'a str) -> Result<Self, ParseError> {
        let mut lines = Vec::new();

        for (i, raw) in text.lines().enumerate() {
            let content = match raw.find('#') {
                Some(pos) => &raw[..pos],
                None => raw,
            };
            let content = content.trim_end();
            let text = content.trim_start();
            if text.is_empty() {
                continue;
            }

            let leading = &content[..content.len() - text.len()];
            if let Some(pos) = leading.find(|c: char| c != ' ') {
                let message = if leading[pos..].starts_with('\t') {
                    "tabs are not allowed in indentation, use spaces"
                } else {
                    "only spaces are allowed in indentation"
                };
                return Err(ParseError::Fatal {
                    line: i + 1,
                    column: pos + 1,
                    message: message.to_string(),
                });
            }

            lines.push(Line {
                number: i + 1,
                indent: leading.len(),
                text,
            });
        }

        Ok(Self {
            lines,
            pos: 0,
            indent_stack: vec![0],
        })
    }

    /// parse every rule in the input
    pub fn parse(mut self) -> Result<Vec<Rule>, ParseError> {
        let mut rules = Vec::new();

        while let Some(line) = self.peek() {
            // at the top level there is nothing to unindent to
            self.check_peer(line).map_err(ParseError::into_fatal)?;
            self.pos += 1;
            rules.push(self.rule(line)?);
        }

        Ok(rules)
    }

    fn peek(&self) -> Option<Line<'a>> {
        self.lines.get(self.pos).copied()
    }

    fn top(&self) -> usize {
        self.indent_stack.last().copied().unwrap_or(0)
    }

    fn enclosing(&self) -> usize {
        self.indent_stack
            .len()
            .checked_sub(2)
            .map(|i| self.indent_stack[i])
            .unwrap_or(0)
    }

    fn check_peer(&self, line: Line<'a>) -> Result<(), ParseError> {
        if line.indent == self.top() {
            return Ok(());
        }
        if line.indent > self.top() {
            return Err(line.fatal(line.text, "illegal nesting"));
        }
        Err(line.mismatch("not a peer entry"))
    }

    fn indent(&mut self, line: Line<'a>) -> Result<(), ParseError> {
        if line.indent > self.top() {
            self.indent_stack.push(line.indent);
            Ok(())
        } else {
            Err(line.mismatch("not an indent"))
        }
    }

    fn check_unindent(&self, line: Line<'a>) -> Result<(), ParseError> {
        if line.indent < self.top() && line.indent <= self.enclosing() {
            Ok(())
        } else {
            Err(line.mismatch("not an unindent"))
        }
    }

    /// parse the indented body following `header`
    fn block(&mut self, header: Line<'a>) -> Result<Vec<Clause>, ParseError> {
        let first = self.peek().ok_or_else(|| {
            header.fatal(header.text, "expected an indented block, found end of input")
        })?;
        self.indent(first)
            .map_err(|_| first.fatal(first.text, "expected an indented block"))?;

        let mut clauses = Vec::new();
        while let Some(line) = self.peek() {
            match self.check_peer(line) {
                Ok(()) => {
                    self.pos += 1;
                    clauses.push(self.clause(line)?);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(_) => break,
            }
        }

        if let Some(line) = self.peek() {
            self.check_unindent(line)
                .map_err(|_| line.fatal(line.text, "illegal nesting"))?;
        }
        self.indent_stack.pop();

        Ok(clauses)
    }

    /// `wake <mac> [<address>]:` followed by a block
    fn rule(&mut self, line: Line<'a>) -> Result<Rule, ParseError> {
        let words = line.words();
        if words.first() != Some(&"wake") {
            let found = words.first().copied().unwrap_or(line.text);
            let mut message = format!("expected a rule header 'wake <mac>:', found '{}'", found);
            if closest(found, ["wake"].into_iter()).is_some() {
                message.push_str(" (did you mean 'wake'?)");
            } else if CLAUSE_KEYWORDS.iter().any(|k| k.trim_end_matches(':') == found) {
                message.push_str(" (conditions must be indented under a rule)");
            }
            return Err(line.fatal(found, message));
        }

        let header = line
            .text
            .strip_suffix(':')
            .ok_or_else(|| line.fatal(line.text, "expected ':' at the end of the rule header"))?;
        let words: Vec<&str> = header.split_whitespace().collect();

        let mac_word = words
            .get(1)
            .copied()
            .ok_or_else(|| line.fatal(line.text, "expected a mac address after 'wake'"))?;
        let mac: MacAddress = mac_word
            .parse()
            .map_err(|e: super::types::MacParseError| line.fatal(mac_word, e.to_string()))?;

        let mut host = Host::new(mac);
        if let Some(addr_word) = words.get(2).copied() {
            let address: IpAddr = addr_word
                .parse()
                .map_err(|_| line.fatal(addr_word, format!("invalid address '{}'", addr_word)))?;
            host = host.with_address(address);
        }
        if let Some(extra) = words.get(3).copied() {
            return Err(line.fatal(extra, format!("unexpected '{}' in rule header", extra)));
        }

        let mut args = vec![RuleArg::Host(host)];
        let mut nodes = Vec::new();
        for clause in self.block(line)? {
            match clause {
                Clause::Node(node) => nodes.push(node),
                Clause::HoldOff(secs) => args.push(RuleArg::HoldOff(secs)),
            }
        }
        args.push(RuleArg::When(When::new(nodes)));

        Rule::from_args(args).map_err(|source| ParseError::Configuration {
            line: line.number,
            source,
        })
    }

    /// try each clause alternative in turn
    fn clause(&mut self, line: Line<'a>) -> Result<Clause, ParseError> {
        let alternatives: [Alternative<'a>; 5] = [
            Self::time_window,
            Self::inactivity,
            Self::hold_off,
            Self::day_restriction,
            Self::group,
        ];

        for alternative in alternatives {
            match alternative(self, line) {
                Err(e) if !e.is_fatal() => continue,
                result => return result,
            }
        }

        let first = line.words().first().copied().unwrap_or(line.text);
        let mut message = format!("unrecognized clause '{}'", line.text);
        if first == "wake" {
            message = "rules cannot be nested inside other rules".to_string();
        } else if let Some(keyword) = closest(first, CLAUSE_KEYWORDS.into_iter()) {
            message.push_str(&format!(" (did you mean '{}'?)", keyword));
        }
        Err(line.fatal(line.text, message))
    }

    /// `hh[:mm[:ss]] < now < hh[:mm[:ss]]`
    fn time_window(&mut self, line: Line<'a>) -> Result<Clause, ParseError> {
        if !line.text.contains('<') {
            return Err(line.mismatch("not a time window"));
        }

        let parts: Vec<&str> = line.text.split('<').map(str::trim).collect();
        if parts.len() != 3 || parts[1] != "now" {
            return Err(line.fatal(line.text, "expected 'hh:mm < now < hh:mm'"));
        }

        let parse = |part: &str| {
            parse_time(part)
                .ok_or_else(|| line.fatal(part, format!("malformed time '{}', expected hh[:mm[:ss]]", part)))
        };
        let start = parse(parts[0])?;
        let end = parse(parts[2])?;

        if start >= end {
            return Err(line.fatal(
                parts[2],
                "time window must end after it starts (windows cannot span midnight)",
            ));
        }

        Ok(Clause::Node(Node::leaf(Condition::TimeBetween { start, end })))
    }

    /// `inactivity <integer> <unit>`
    fn inactivity(&mut self, line: Line<'a>) -> Result<Clause, ParseError> {
        let words = line.words();
        if words.first() != Some(&"inactivity") {
            return Err(line.mismatch("not an inactivity clause"));
        }
        let secs = interval(line, &words[1..])?;
        Ok(Clause::Node(Node::leaf(Condition::InactiveFor(secs))))
    }

    /// `hold off <integer> <unit>`
    fn hold_off(&mut self, line: Line<'a>) -> Result<Clause, ParseError> {
        let words = line.words();
        if words.first() != Some(&"hold") {
            return Err(line.mismatch("not a hold off clause"));
        }
        if words.get(1) != Some(&"off") {
            return Err(line.fatal(line.text, "expected 'hold off <integer> <unit>'"));
        }
        let secs = interval(line, &words[2..])?;
        Ok(Clause::HoldOff(secs))
    }

    /// `now [not] <weekday>...`
    fn day_restriction(&mut self, line: Line<'a>) -> Result<Clause, ParseError> {
        let words = line.words();
        if words.first() != Some(&"now") {
            return Err(line.mismatch("not a day restriction"));
        }

        let (negated, names) = match words.get(1) {
            Some(&"not") => (true, &words[2..]),
            _ => (false, &words[1..]),
        };
        if names.is_empty() {
            return Err(line.fatal(line.text, "expected at least one weekday"));
        }

        let mut days = Vec::new();
        for name in names {
            let day = parse_weekday(name).ok_or_else(|| {
                let mut message = format!("unknown weekday '{}'", name);
                if let Some(suggestion) = suggest_weekday(name) {
                    message.push_str(&format!(" (did you mean '{}'?)", suggestion));
                }
                line.fatal(name, message)
            })?;
            if !days.contains(&day) {
                days.push(day);
            }
        }

        let node = Node::leaf(Condition::DayOfWeek(days));
        Ok(Clause::Node(if negated { Node::negate(node) } else { node }))
    }

    /// `all:`, `any:` or `not:` followed by a block
    fn group(&mut self, line: Line<'a>) -> Result<Clause, ParseError> {
        let (keyword, has_colon) = match line.text.strip_suffix(':') {
            Some(rest) => (rest.trim_end(), true),
            None => (line.text, false),
        };
        if !matches!(keyword, "all" | "any" | "not") {
            return Err(line.mismatch("not a group"));
        }
        if !has_colon {
            return Err(line.fatal(line.text, format!("expected ':' after '{}'", keyword)));
        }

        let children: Vec<Node<Condition>> = self
            .block(line)?
            .into_iter()
            .map(|clause| match clause {
                Clause::Node(node) => node,
                Clause::HoldOff(secs) => Node::leaf(Condition::HoldOff(secs)),
            })
            .collect();

        let node = match keyword {
            "all" => Node::and(children),
            "any" => Node::or(children),
            _ => Node::not_of(children).map_err(|source| ParseError::Configuration {
                line: line.number,
                source,
            })?,
        };
        Ok(Clause::Node(node))
    }
}

/// `<integer> <unit>` in seconds
fn interval(line: Line<'_>, words: &[&str]) -> Result<u64, ParseError> {
    let (amount, unit) = match words {
        [amount, unit] => (*amount, *unit),
        _ => {
            return Err(line.fatal(
                line.text,
                format!("expected '<integer> <unit>' with unit one of {}", unit_names().join(", ")),
            ))
        }
    };

    let amount: u64 = amount
        .parse()
        .map_err(|_| line.fatal(amount, format!("expected an integer, found '{}'", amount)))?;
    let per_unit = unit_seconds(unit).ok_or_else(|| {
        line.fatal(
            unit,
            format!("unknown unit '{}', expected one of {}", unit, unit_names().join(", ")),
        )
    })?;

    amount
        .checked_mul(per_unit)
        .ok_or_else(|| line.fatal(line.text, "interval is too large"))
}
