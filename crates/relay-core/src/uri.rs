//! Request-target path extraction
//!
//! The target is parsed as an RFC 3986 URI reference: absolute URIs,
//! network-path, absolute-path and relative-path references are all
//! accepted, anything with a character its component does not allow is not.
//! Routes match against the decoded path only; query and fragment never
//! take part.

/// Components of a URI reference, borrowed from the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UriRef<'a> {
    pub scheme: Option<&'a str>,
    pub authority: Option<&'a str>,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub fragment: Option<&'a str>,
}

impl<'a> UriRef<'a> {
    /// Split and validate a URI reference. `None` if it is malformed.
    pub fn parse(s: &'a str) -> Option<Self> {
        let (rest, fragment) = match s.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (s, None),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Some(query)),
            None => (rest, None),
        };

        // A colon before any slash ends the scheme; a relative path may not
        // have one in its first segment
        let (scheme, hier) = match rest.find(':') {
            Some(i) if !rest[..i].contains('/') => (Some(&rest[..i]), &rest[i + 1..]),
            _ => (None, rest),
        };

        let (authority, path) = match hier.strip_prefix("//") {
            Some(after) => {
                let end = after.find('/').unwrap_or(after.len());
                (Some(&after[..end]), &after[end..])
            }
            None => (None, hier),
        };

        if !scheme.map_or(true, valid_scheme)
            || !authority.map_or(true, valid_authority)
            || !valid_component(path, &[':', '@', '/'])
            || !query.map_or(true, |q| valid_component(q, &[':', '@', '/', '?']))
            || !fragment.map_or(true, |f| valid_component(f, &[':', '@', '/', '?']))
        {
            return None;
        }

        Some(Self {
            scheme,
            authority,
            path,
            query,
            fragment,
        })
    }
}

/// Extract and decode the path component of a request-target.
///
/// Returns `None` when the target is not a valid URI reference.
pub fn decoded_path(target: &str) -> Option<String> {
    let uri = UriRef::parse(target)?;
    percent_decode(uri.path)
}

fn valid_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn valid_authority(s: &str) -> bool {
    let (userinfo, host_port) = match s.split_once('@') {
        Some((userinfo, host_port)) => (Some(userinfo), host_port),
        None => (None, s),
    };
    if !userinfo.map_or(true, |u| valid_component(u, &[':'])) {
        return false;
    }

    let port = if let Some(rest) = host_port.strip_prefix('[') {
        let Some((literal, after)) = rest.split_once(']') else {
            return false;
        };
        let ipv6 = literal.contains(':')
            && literal.chars().all(|c| c.is_ascii_hexdigit() || matches!(c, ':' | '.'));
        if !ipv6 {
            return false;
        }
        match after {
            "" => None,
            _ => match after.strip_prefix(':') {
                Some(port) => Some(port),
                None => return false,
            },
        }
    } else {
        let (host, port) = match host_port.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (host_port, None),
        };
        if !valid_component(host, &[]) {
            return false;
        }
        port
    };

    port.map_or(true, |p| p.bytes().all(|b| b.is_ascii_digit()))
}

/// Every char is unreserved, a sub-delim, a well-formed escape, non-ASCII
/// printable, or one of `extra`.
fn valid_component(s: &str, extra: &[char]) -> bool {
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        let ok = match c {
            '%' => matches!(
                (chars.next(), chars.next()),
                (Some(hi), Some(lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit()
            ),
            c if c.is_ascii_alphanumeric() => true,
            '-' | '.' | '_' | '~' => true,
            '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';' | '=' => true,
            c if !c.is_ascii() => !c.is_whitespace() && !c.is_control(),
            c => extra.contains(&c),
        };
        if !ok {
            return false;
        }
    }
    true
}

/// Decode `%XX` escapes as UTF-8. Invalid UTF-8 is replaced, not rejected.
fn percent_decode(s: &str) -> Option<String> {
    if !s.contains('%') {
        return Some(s.to_string());
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = hex_value(*bytes.get(i + 1)?)?;
            let lo = hex_value(*bytes.get(i + 2)?)?;
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    Some(String::from_utf8_lossy(&out).into_owned())
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
