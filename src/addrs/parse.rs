//! Parsing of absolute resource instance addresses.
//!
//! Accepted grammar:
//!
//! ```text
//! address := (module_step ".")* resource key?
//! module_step := "module." IDENT key?
//! resource := ("data." | "ephemeral.")? IDENT "." IDENT
//! key := "[" (INT | STRING) "]"
//! ```

use std::str::FromStr;

use crate::error::AddressError;

use super::resource::{InstanceKey, ModuleInstanceStep, ResourceInstanceAddr, ResourceMode};

impl FromStr for ResourceInstanceAddr {
    type Err = AddressError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut cursor = Cursor { input, pos: 0 };
        let mut module = Vec::new();

        loop {
            let word = cursor.ident()?;
            cursor.expect('.')?;

            let mode = match word {
                "module" => {
                    let name = cursor.ident()?.to_string();
                    let key = cursor.key()?;
                    cursor.expect('.')?;
                    module.push(ModuleInstanceStep { name, key });
                    continue;
                }
                "data" => ResourceMode::Data,
                "ephemeral" => ResourceMode::Ephemeral,
                _ => {
                    let name = cursor.ident()?.to_string();
                    let key = cursor.key()?;
                    cursor.end()?;
                    return Ok(Self {
                        module,
                        mode: ResourceMode::Managed,
                        resource_type: word.to_string(),
                        name,
                        key,
                    });
                }
            };

            let resource_type = cursor.ident()?.to_string();
            cursor.expect('.')?;
            let name = cursor.ident()?.to_string();
            let key = cursor.key()?;
            cursor.end()?;
            return Ok(Self {
                module,
                mode,
                resource_type,
                name,
                key,
            });
        }
    }
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn error(&self, reason: impl Into<String>) -> AddressError {
        AddressError::invalid(self.input, reason)
    }

    fn expect(&mut self, want: char) -> Result<(), AddressError> {
        match self.peek() {
            Some(c) if c == want => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{want}' at offset {}, found '{c}'", self.pos))),
            None => Err(self.error(format!("expected '{want}' at end of address"))),
        }
    }

    fn end(&self) -> Result<(), AddressError> {
        if self.rest().is_empty() {
            Ok(())
        } else {
            Err(self.error(format!("unexpected trailing input {:?}", self.rest())))
        }
    }

    fn ident(&mut self) -> Result<&'a str, AddressError> {
        let rest = self.rest();
        let mut chars = rest.char_indices();

        match chars.next() {
            Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
            Some((_, c)) => {
                return Err(self.error(format!("identifier cannot start with '{c}'")));
            }
            None => return Err(self.error("expected an identifier")),
        }

        let len = chars
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
            .map_or(rest.len(), |(i, _)| i);

        self.pos += len;
        Ok(&rest[..len])
    }

    fn key(&mut self) -> Result<Option<InstanceKey>, AddressError> {
        if self.peek() != Some('[') {
            return Ok(None);
        }
        self.pos += 1;

        let key = if self.peek() == Some('"') {
            self.pos += 1;
            InstanceKey::Str(self.quoted()?)
        } else {
            let rest = self.rest();
            let len = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            if len == 0 {
                return Err(self.error("instance key must be an integer or a quoted string"));
            }
            let index = rest[..len]
                .parse()
                .map_err(|e| self.error(format!("invalid instance index: {e}")))?;
            self.pos += len;
            InstanceKey::Int(index)
        };

        self.expect(']')?;
        Ok(Some(key))
    }

    /// Reads a string body up to and including the closing quote.
    fn quoted(&mut self) -> Result<String, AddressError> {
        let mut out = String::new();
        let mut escaped = false;

        for (i, c) in self.rest().char_indices() {
            if escaped {
                out.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                self.pos += i + 1;
                return Ok(out);
            } else {
                out.push(c);
            }
        }

        Err(self.error("unterminated string key"))
    }
}
