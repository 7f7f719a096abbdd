//! Parser for Proxmox's `token[,token]*` property strings.
//!
//! Each token is either `key=value` or a bare value, e.g.
//! `virtio=BC:24:11:00:00:01,bridge=vmbr1,firewall=1` or
//! `local-lvm:vm-100-disk-0,size=50G`. Consumers look keys up and ignore the
//! rest. When a key repeats, the last occurrence wins.

/// One comma-separated token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Pair { key: &'a str, value: &'a str },
    Bare(&'a str),
}

/// A parsed property string, tokens kept in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvList<'a> {
    tokens: Vec<Token<'a>>,
}

/// Split `raw` into tokens. Empty tokens are skipped and whitespace trimmed.
pub fn parse(raw: &str) -> KvList<'_> {
    let tokens = raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| match t.split_once('=') {
            Some((key, value)) => Token::Pair {
                key: key.trim(),
                value: value.trim(),
            },
            None => Token::Bare(t),
        })
        .collect();
    KvList { tokens }
}

impl<'a> KvList<'a> {
    /// Value of the last `key=...` token with this key.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.tokens.iter().rev().find_map(|t| match *t {
            Token::Pair { key: k, value } if k == key => Some(value),
            _ => None,
        })
    }

    /// The leading token, which carries the positional value for most slots.
    pub fn first(&self) -> Option<Token<'a>> {
        self.tokens.first().copied()
    }

    /// First bare (non `key=value`) token.
    pub fn bare(&self) -> Option<&'a str> {
        self.tokens.iter().find_map(|t| match *t {
            Token::Bare(v) => Some(v),
            Token::Pair { .. } => None,
        })
    }
}

#[cfg(test)]
impl KvList<'_> {
    fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn len(&self) -> usize {
        self.tokens.len()
    }
}
