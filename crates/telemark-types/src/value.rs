//! The `Data` value domain.
//!
//! A [`Data`] is a dynamically-typed value covering every variant of the
//! type model. Synopsis probes and predicate right-hand sides are `Data`;
//! probes are passed by reference, so no owning copies are made on the
//! lookup path.
//!
//! Equality and ordering are *numeric-transparent*: `integer 3`, `count 3`
//! and `real 3.0` compare equal, with precision-preserving comparison for
//! values beyond the 2^53 mantissa range. Conversions between the numeric
//! variants are explicit ([`Data::narrow_to_integer`] and friends) and fail
//! rather than silently change a value.

use std::cmp::Ordering;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use telemark_error::{Result, TelemarkError};

use crate::schema::{RecordField, Type};

// ---------------------------------------------------------------------------
// Pattern
// ---------------------------------------------------------------------------

/// How a pattern's expression is interpreted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PatternKind {
    /// A regular expression.
    Regex,
    /// A shell-style glob (`*` and `?` wildcards).
    Glob,
}

/// A textual pattern, matched as regex or glob.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Pattern {
    kind: PatternKind,
    expr: String,
}

impl Pattern {
    pub fn regex(expr: impl Into<String>) -> Self {
        Self {
            kind: PatternKind::Regex,
            expr: expr.into(),
        }
    }

    pub fn glob(expr: impl Into<String>) -> Self {
        Self {
            kind: PatternKind::Glob,
            expr: expr.into(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.expr
    }

    #[must_use]
    pub const fn kind(&self) -> PatternKind {
        self.kind
    }

    /// Validate that the pattern compiles.
    pub fn validate(&self) -> Result<()> {
        Regex::new(&self.regex_source()).map(drop).map_err(|e| {
            TelemarkError::PatternSyntax {
                pattern: self.expr.clone(),
                detail: e.to_string(),
            }
        })
    }

    fn regex_source(&self) -> String {
        match self.kind {
            PatternKind::Regex => self.expr.clone(),
            PatternKind::Glob => {
                let mut out = String::with_capacity(self.expr.len() + 8);
                for c in self.expr.chars() {
                    match c {
                        '*' => out.push_str(".*"),
                        '?' => out.push('.'),
                        c if regex_meta(c) => {
                            out.push('\\');
                            out.push(c);
                        }
                        c => out.push(c),
                    }
                }
                out
            }
        }
    }

    /// Whether the pattern matches the entire input.
    #[must_use]
    pub fn is_match(&self, input: &str) -> bool {
        let anchored = format!("^(?:{})$", self.regex_source());
        Regex::new(&anchored).is_ok_and(|re| re.is_match(input))
    }

    /// Whether the pattern matches anywhere inside the input.
    #[must_use]
    pub fn search(&self, input: &str) -> bool {
        Regex::new(&self.regex_source()).is_ok_and(|re| re.is_match(input))
    }
}

const fn regex_meta(c: char) -> bool {
    matches!(
        c,
        '.' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '\\'
    )
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.expr)
    }
}

// ---------------------------------------------------------------------------
// Subnet
// ---------------------------------------------------------------------------

/// An IP prefix: a network address and a prefix length.
///
/// The stored network address is always masked to the prefix length, so two
/// subnets written differently but denoting the same prefix compare equal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Subnet {
    network: IpAddr,
    length: u8,
}

impl Subnet {
    /// Build a subnet, clamping the length to the address family's maximum
    /// and masking host bits off the network address.
    #[must_use]
    pub fn new(network: IpAddr, length: u8) -> Self {
        let length = length.min(family_bits(&network));
        Self {
            network: mask_addr(&network, length),
            length,
        }
    }

    #[must_use]
    pub const fn network(&self) -> IpAddr {
        self.network
    }

    #[must_use]
    pub const fn length(&self) -> u8 {
        self.length
    }

    /// Whether the address lies inside this prefix. Addresses of the other
    /// family never match.
    #[must_use]
    pub fn contains(&self, addr: &IpAddr) -> bool {
        same_family(&self.network, addr) && mask_addr(addr, self.length) == self.network
    }

    /// Whether the other subnet is fully contained in this one.
    #[must_use]
    pub fn contains_subnet(&self, other: &Self) -> bool {
        same_family(&self.network, &other.network)
            && other.length >= self.length
            && mask_addr(&other.network, self.length) == self.network
    }
}

const fn family_bits(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

const fn same_family(a: &IpAddr, b: &IpAddr) -> bool {
    matches!(
        (a, b),
        (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_))
    )
}

fn mask_addr(addr: &IpAddr, length: u8) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => {
            let bits = u32::from(*v4);
            let mask = if length == 0 {
                0
            } else {
                u32::MAX << (32 - u32::from(length.min(32)))
            };
            IpAddr::V4(Ipv4Addr::from(bits & mask))
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(*v6);
            let mask = if length == 0 {
                0
            } else {
                u128::MAX << (128 - u32::from(length.min(128)))
            };
            IpAddr::V6(Ipv6Addr::from(bits & mask))
        }
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.length)
    }
}

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// Transport protocol of a [`Port`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PortProtocol {
    Unknown,
    Tcp,
    Udp,
    Icmp,
}

impl fmt::Display for PortProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "?",
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Icmp => "icmp",
        };
        f.write_str(s)
    }
}

/// A transport-layer port with its protocol.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Port {
    number: u16,
    protocol: PortProtocol,
}

impl Port {
    #[must_use]
    pub const fn new(number: u16, protocol: PortProtocol) -> Self {
        Self { number, protocol }
    }

    #[must_use]
    pub const fn number(&self) -> u16 {
        self.number
    }

    #[must_use]
    pub const fn protocol(&self) -> PortProtocol {
        self.protocol
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.number, self.protocol)
    }
}

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

/// A dynamically-typed value covering every variant of the type model.
#[derive(Debug, Clone)]
pub enum Data {
    None,
    Bool(bool),
    Integer(i64),
    Count(u64),
    Real(f64),
    Time(DateTime<Utc>),
    Duration(Duration),
    String(String),
    Pattern(Pattern),
    Address(IpAddr),
    Subnet(Subnet),
    Port(Port),
    Enumeration(String),
    List(Vec<Data>),
    Map(Vec<(Data, Data)>),
    Record(Vec<Data>),
}

impl Data {
    /// The lower-case variant name, for diagnostics.
    #[must_use]
    pub const fn variant_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Count(_) => "count",
            Self::Real(_) => "real",
            Self::Time(_) => "time",
            Self::Duration(_) => "duration",
            Self::String(_) => "string",
            Self::Pattern(_) => "pattern",
            Self::Address(_) => "address",
            Self::Subnet(_) => "subnet",
            Self::Port(_) => "port",
            Self::Enumeration(_) => "enumeration",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
        }
    }

    /// The type describing this value. Composite element types are inferred
    /// from the first element and fall back to `none` when empty.
    #[must_use]
    pub fn ty(&self) -> Type {
        match self {
            Self::None => Type::none(),
            Self::Bool(_) => Type::boolean(),
            Self::Integer(_) => Type::integer(),
            Self::Count(_) => Type::count(),
            Self::Real(_) => Type::real(),
            Self::Time(_) => Type::time(),
            Self::Duration(_) => Type::duration(),
            Self::String(_) => Type::string(),
            Self::Pattern(_) => Type::pattern(),
            Self::Address(_) => Type::address(),
            Self::Subnet(_) => Type::subnet(),
            Self::Port(_) => Type::port(),
            Self::Enumeration(_) => Type::enumeration(Vec::<String>::new()),
            Self::List(xs) => Type::list(xs.first().map_or_else(Type::none, Self::ty)),
            Self::Map(pairs) => {
                let (k, v) = pairs.first().map_or_else(
                    || (Type::none(), Type::none()),
                    |(k, v)| (k.ty(), v.ty()),
                );
                Type::map(k, v)
            }
            Self::Record(xs) => Type::record(
                xs.iter()
                    .map(|x| RecordField::new(String::new(), x.ty())),
            ),
        }
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    // -- numeric narrowing --------------------------------------------------

    /// Convert to a signed integer, failing if the value would change.
    #[allow(clippy::cast_possible_truncation)]
    pub fn narrow_to_integer(&self) -> Result<i64> {
        match self {
            Self::Integer(i) => Ok(*i),
            Self::Count(c) => i64::try_from(*c).map_err(|_| self.narrowing_error("integer")),
            Self::Real(r) => {
                if r.is_finite()
                    && r.fract() == 0.0
                    && (-9_223_372_036_854_775_808.0..9_223_372_036_854_775_808.0).contains(r)
                {
                    Ok(*r as i64)
                } else {
                    Err(self.narrowing_error("integer"))
                }
            }
            _ => Err(self.narrowing_error("integer")),
        }
    }

    /// Convert to an unsigned count, failing if the value would change.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn narrow_to_count(&self) -> Result<u64> {
        match self {
            Self::Count(c) => Ok(*c),
            Self::Integer(i) => u64::try_from(*i).map_err(|_| self.narrowing_error("count")),
            Self::Real(r) => {
                if r.is_finite()
                    && r.fract() == 0.0
                    && (0.0..18_446_744_073_709_551_616.0).contains(r)
                {
                    Ok(*r as u64)
                } else {
                    Err(self.narrowing_error("count"))
                }
            }
            _ => Err(self.narrowing_error("count")),
        }
    }

    /// Convert to a real, failing when the integer has no exact double
    /// representation.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::float_cmp
    )]
    pub fn narrow_to_real(&self) -> Result<f64> {
        match self {
            Self::Real(r) => Ok(*r),
            Self::Integer(i) => {
                let r = *i as f64;
                if (-9_223_372_036_854_775_808.0..9_223_372_036_854_775_808.0).contains(&r)
                    && r as i64 == *i
                {
                    Ok(r)
                } else {
                    Err(self.narrowing_error("real"))
                }
            }
            Self::Count(c) => {
                let r = *c as f64;
                if r < 18_446_744_073_709_551_616.0 && r as u64 == *c {
                    Ok(r)
                } else {
                    Err(self.narrowing_error("real"))
                }
            }
            _ => Err(self.narrowing_error("real")),
        }
    }

    fn narrowing_error(&self, to: &'static str) -> TelemarkError {
        TelemarkError::NumericNarrowing {
            from: self.variant_name(),
            to,
            value: self.to_string(),
        }
    }

    // -- canonical encoding -------------------------------------------------

    /// Deterministic byte encoding used by hashing synopses.
    ///
    /// Each variant gets a distinct tag, so the encoding is injective per
    /// variant. Cross-variant numeric equivalence is handled by narrowing
    /// probes before hashing, not by the encoding.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(24);
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::None => out.push(0x00),
            Self::Bool(b) => {
                out.push(0x01);
                out.push(u8::from(*b));
            }
            Self::Integer(i) => {
                out.push(0x02);
                out.extend_from_slice(&i.to_be_bytes());
            }
            Self::Count(c) => {
                out.push(0x03);
                out.extend_from_slice(&c.to_be_bytes());
            }
            Self::Real(r) => {
                out.push(0x04);
                out.extend_from_slice(&r.to_bits().to_be_bytes());
            }
            Self::Time(t) => {
                out.push(0x05);
                let ns = t
                    .timestamp_nanos_opt()
                    .unwrap_or_else(|| t.timestamp_micros().saturating_mul(1000));
                out.extend_from_slice(&ns.to_be_bytes());
            }
            Self::Duration(d) => {
                out.push(0x06);
                let ns = d.num_nanoseconds().unwrap_or(i64::MAX);
                out.extend_from_slice(&ns.to_be_bytes());
            }
            Self::String(s) => {
                out.push(0x07);
                out.extend_from_slice(&(s.len() as u64).to_be_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            Self::Pattern(p) => {
                out.push(0x08);
                out.push(match p.kind() {
                    PatternKind::Regex => 0,
                    PatternKind::Glob => 1,
                });
                out.extend_from_slice(p.as_str().as_bytes());
            }
            Self::Address(a) => match a {
                IpAddr::V4(v4) => {
                    out.push(0x09);
                    out.extend_from_slice(&v4.octets());
                }
                IpAddr::V6(v6) => {
                    out.push(0x0a);
                    out.extend_from_slice(&v6.octets());
                }
            },
            Self::Subnet(s) => {
                out.push(0x0b);
                Self::Address(s.network()).encode_into(out);
                out.push(s.length());
            }
            Self::Port(p) => {
                out.push(0x0c);
                out.extend_from_slice(&p.number().to_be_bytes());
                out.push(match p.protocol() {
                    PortProtocol::Unknown => 0,
                    PortProtocol::Tcp => 1,
                    PortProtocol::Udp => 2,
                    PortProtocol::Icmp => 3,
                });
            }
            Self::Enumeration(s) => {
                out.push(0x0d);
                out.extend_from_slice(s.as_bytes());
            }
            Self::List(xs) => {
                out.push(0x0e);
                out.extend_from_slice(&(xs.len() as u64).to_be_bytes());
                for x in xs {
                    x.encode_into(out);
                }
            }
            Self::Map(pairs) => {
                out.push(0x0f);
                out.extend_from_slice(&(pairs.len() as u64).to_be_bytes());
                for (k, v) in pairs {
                    k.encode_into(out);
                    v.encode_into(out);
                }
            }
            Self::Record(xs) => {
                out.push(0x10);
                out.extend_from_slice(&(xs.len() as u64).to_be_bytes());
                for x in xs {
                    x.encode_into(out);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Compare an integer with a real, preserving precision beyond 2^53.
///
/// The naive `(i as f64).partial_cmp(&r)` conflates distinct large integers
/// that round to the same double.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn int_real_cmp(i: i64, r: f64) -> Option<Ordering> {
    if r.is_nan() {
        return None;
    }
    if r < -9_223_372_036_854_775_808.0 {
        return Some(Ordering::Greater);
    }
    if r >= 9_223_372_036_854_775_808.0 {
        return Some(Ordering::Less);
    }
    let y = r as i64;
    match i.cmp(&y) {
        Ordering::Equal => (i as f64).partial_cmp(&r),
        other => Some(other),
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn count_real_cmp(c: u64, r: f64) -> Option<Ordering> {
    if r.is_nan() {
        return None;
    }
    if r < 0.0 {
        return Some(Ordering::Greater);
    }
    if r >= 18_446_744_073_709_551_616.0 {
        return Some(Ordering::Less);
    }
    let y = r as u64;
    match c.cmp(&y) {
        Ordering::Equal => (c as f64).partial_cmp(&r),
        other => Some(other),
    }
}

#[allow(clippy::cast_sign_loss)]
fn int_count_cmp(i: i64, c: u64) -> Ordering {
    if i < 0 {
        Ordering::Less
    } else {
        (i as u64).cmp(&c)
    }
}

fn seq_cmp(a: &[Data], b: &[Data]) -> Option<Ordering> {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.partial_cmp(y)? {
            Ordering::Equal => {}
            other => return Some(other),
        }
    }
    Some(a.len().cmp(&b.len()))
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        matches!(self.partial_cmp(other), Some(Ordering::Equal))
    }
}

impl PartialOrd for Data {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use Data::{
            Address, Bool, Count, Duration, Enumeration, Integer, List, Map, Pattern, Port,
            Real, Record, String, Subnet, Time,
        };
        match (self, other) {
            (Self::None, Self::None) => Some(Ordering::Equal),
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            (Integer(a), Integer(b)) => Some(a.cmp(b)),
            (Count(a), Count(b)) => Some(a.cmp(b)),
            (Real(a), Real(b)) => a.partial_cmp(b),
            (Integer(a), Count(b)) => Some(int_count_cmp(*a, *b)),
            (Count(a), Integer(b)) => Some(int_count_cmp(*b, *a).reverse()),
            (Integer(a), Real(b)) => int_real_cmp(*a, *b),
            (Real(a), Integer(b)) => int_real_cmp(*b, *a).map(Ordering::reverse),
            (Count(a), Real(b)) => count_real_cmp(*a, *b),
            (Real(a), Count(b)) => count_real_cmp(*b, *a).map(Ordering::reverse),
            (Time(a), Time(b)) => Some(a.cmp(b)),
            (Duration(a), Duration(b)) => Some(a.cmp(b)),
            (String(a), String(b)) => Some(a.cmp(b)),
            (Pattern(a), Pattern(b)) => Some(a.cmp(b)),
            (Address(a), Address(b)) => Some(a.cmp(b)),
            (Subnet(a), Subnet(b)) => Some(a.cmp(b)),
            (Port(a), Port(b)) => Some(a.cmp(b)),
            (Enumeration(a), Enumeration(b)) => Some(a.cmp(b)),
            (List(a), List(b)) | (Record(a), Record(b)) => seq_cmp(a, b),
            (Map(a), Map(b)) => {
                for ((ak, av), (bk, bv)) in a.iter().zip(b.iter()) {
                    match ak.partial_cmp(bk)? {
                        Ordering::Equal => {}
                        other => return Some(other),
                    }
                    match av.partial_cmp(bv)? {
                        Ordering::Equal => {}
                        other => return Some(other),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// From conversions
// ---------------------------------------------------------------------------

impl From<bool> for Data {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Data {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<u64> for Data {
    fn from(c: u64) -> Self {
        Self::Count(c)
    }
}

impl From<f64> for Data {
    fn from(r: f64) -> Self {
        Self::Real(r)
    }
}

impl From<&str> for Data {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Data {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<IpAddr> for Data {
    fn from(a: IpAddr) -> Self {
        Self::Address(a)
    }
}

impl From<Subnet> for Data {
    fn from(s: Subnet) -> Self {
        Self::Subnet(s)
    }
}

impl From<Port> for Data {
    fn from(p: Port) -> Self {
        Self::Port(p)
    }
}

impl From<Pattern> for Data {
    fn from(p: Pattern) -> Self {
        Self::Pattern(p)
    }
}

impl From<DateTime<Utc>> for Data {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Time(t)
    }
}

impl From<Duration> for Data {
    fn from(d: Duration) -> Self {
        Self::Duration(d)
    }
}

impl From<Vec<Data>> for Data {
    fn from(xs: Vec<Data>) -> Self {
        Self::List(xs)
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

fn format_duration(d: &Duration, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let ns = d.num_nanoseconds().unwrap_or(i64::MAX);
    if ns == 0 {
        return f.write_str("0s");
    }
    let sign = if ns < 0 { "-" } else { "" };
    let abs = ns.unsigned_abs();
    // Pick the largest unit the value is an exact or >= 1 multiple of.
    const UNITS: [(u64, &str); 6] = [
        (86_400_000_000_000, "d"),
        (3_600_000_000_000, "h"),
        (60_000_000_000, "min"),
        (1_000_000_000, "s"),
        (1_000_000, "ms"),
        (1_000, "us"),
    ];
    for (scale, suffix) in UNITS {
        if abs >= scale {
            #[allow(clippy::cast_precision_loss)]
            let value = abs as f64 / scale as f64;
            return write!(f, "{sign}{value}{suffix}");
        }
    }
    write!(f, "{sign}{abs}ns")
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("nil"),
            Self::Bool(true) => f.write_str("T"),
            Self::Bool(false) => f.write_str("F"),
            Self::Integer(i) => {
                if *i >= 0 {
                    write!(f, "+{i}")
                } else {
                    write!(f, "{i}")
                }
            }
            Self::Count(c) => write!(f, "{c}"),
            Self::Real(r) => {
                if r.fract() == 0.0 && r.is_finite() && r.abs() < 1e15 {
                    write!(f, "{r:.1}")
                } else {
                    write!(f, "{r}")
                }
            }
            Self::Time(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Duration(d) => format_duration(d, f),
            Self::String(s) => write!(f, "\"{}\"", escape_string(s)),
            Self::Pattern(p) => write!(f, "{p}"),
            Self::Address(a) => write!(f, "{a}"),
            Self::Subnet(s) => write!(f, "{s}"),
            Self::Port(p) => write!(f, "{p}"),
            Self::Enumeration(e) => f.write_str(e),
            Self::List(xs) => {
                f.write_str("[")?;
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{x}")?;
                }
                f.write_str("]")
            }
            Self::Map(pairs) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k} -> {v}")?;
                }
                f.write_str("}")
            }
            Self::Record(xs) => {
                f.write_str("(")?;
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{x}")?;
                }
                f.write_str(")")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(parse_error(self.input, "data value"))
        }
    }

    fn parse_value(&mut self) -> Result<Data> {
        self.skip_ws();
        match self.peek() {
            Some('[') => self.parse_list(),
            Some('{') => self.parse_map(),
            Some('(') => self.parse_record(),
            Some('"') => self.parse_string(),
            Some('/') => self.parse_pattern(),
            Some(_) => self.parse_scalar(),
            None => Err(parse_error(self.input, "data value")),
        }
    }

    fn parse_list(&mut self) -> Result<Data> {
        self.expect('[')?;
        let mut xs = Vec::new();
        self.skip_ws();
        if !self.eat(']') {
            loop {
                xs.push(self.parse_value()?);
                self.skip_ws();
                if self.eat(']') {
                    break;
                }
                self.expect(',')?;
            }
        }
        Ok(Data::List(xs))
    }

    fn parse_record(&mut self) -> Result<Data> {
        self.expect('(')?;
        let mut xs = Vec::new();
        self.skip_ws();
        if !self.eat(')') {
            loop {
                xs.push(self.parse_value()?);
                self.skip_ws();
                if self.eat(')') {
                    break;
                }
                self.expect(',')?;
            }
        }
        Ok(Data::Record(xs))
    }

    fn parse_map(&mut self) -> Result<Data> {
        self.expect('{')?;
        let mut pairs = Vec::new();
        self.skip_ws();
        if !self.eat('}') {
            loop {
                let key = self.parse_value()?;
                self.skip_ws();
                if !self.rest().starts_with("->") {
                    return Err(parse_error(self.input, "map entry"));
                }
                self.pos += 2;
                let value = self.parse_value()?;
                pairs.push((key, value));
                self.skip_ws();
                if self.eat('}') {
                    break;
                }
                self.expect(',')?;
            }
        }
        Ok(Data::Map(pairs))
    }

    fn parse_string(&mut self) -> Result<Data> {
        self.expect('"')?;
        let mut out = String::new();
        let mut chars = self.rest().char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += i + 1;
                    return Ok(Data::String(out));
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, e)) => out.push(e),
                    None => break,
                },
                c => out.push(c),
            }
        }
        Err(parse_error(self.input, "string"))
    }

    fn parse_pattern(&mut self) -> Result<Data> {
        self.expect('/')?;
        if let Some(end) = self.rest().find('/') {
            let expr = &self.rest()[..end];
            let pattern = Pattern::regex(expr);
            pattern.validate()?;
            self.pos += end + 1;
            Ok(Data::Pattern(pattern))
        } else {
            Err(parse_error(self.input, "pattern"))
        }
    }

    fn parse_scalar(&mut self) -> Result<Data> {
        let rest = self.rest();
        let end = rest
            .find([',', ']', '}', ')'])
            .unwrap_or(rest.len());
        let token = rest[..end].trim();
        self.pos += end;
        scalar_from_token(token).ok_or_else(|| parse_error(token, "data value"))
    }
}

fn parse_error(input: &str, expected: &'static str) -> TelemarkError {
    TelemarkError::ParseData {
        input: input.to_owned(),
        expected,
    }
}

fn scalar_from_token(token: &str) -> Option<Data> {
    match token {
        "" => return None,
        "nil" => return Some(Data::None),
        "T" | "true" => return Some(Data::Bool(true)),
        "F" | "false" => return Some(Data::Bool(false)),
        _ => {}
    }
    if let Some(port) = parse_port(token) {
        return Some(Data::Port(port));
    }
    if let Some((addr, len)) = token.split_once('/') {
        if let (Ok(addr), Ok(len)) = (addr.parse::<IpAddr>(), len.parse::<u8>()) {
            return Some(Data::Subnet(Subnet::new(addr, len)));
        }
    }
    if let Ok(addr) = token.parse::<IpAddr>() {
        return Some(Data::Address(addr));
    }
    if let Ok(time) = DateTime::parse_from_rfc3339(token) {
        return Some(Data::Time(time.with_timezone(&Utc)));
    }
    if let Some(duration) = parse_duration(token) {
        return Some(Data::Duration(duration));
    }
    if let Some(stripped) = token.strip_prefix(['+', '-']) {
        if stripped.chars().all(|c| c.is_ascii_digit()) && !stripped.is_empty() {
            return token.parse::<i64>().ok().map(Data::Integer);
        }
    }
    if token.chars().all(|c| c.is_ascii_digit()) {
        return token.parse::<u64>().ok().map(Data::Count);
    }
    if let Ok(real) = token.parse::<f64>() {
        return Some(Data::Real(real));
    }
    None
}

fn parse_port(token: &str) -> Option<Port> {
    let (number, proto) = token.split_once('/')?;
    let number = number.parse::<u16>().ok()?;
    let protocol = match proto {
        "tcp" => PortProtocol::Tcp,
        "udp" => PortProtocol::Udp,
        "icmp" => PortProtocol::Icmp,
        "?" => PortProtocol::Unknown,
        _ => return None,
    };
    Some(Port::new(number, protocol))
}

fn parse_duration(token: &str) -> Option<Duration> {
    const SUFFIXES: [(&str, f64); 7] = [
        ("ns", 1.0),
        ("us", 1_000.0),
        ("ms", 1_000_000.0),
        ("min", 60_000_000_000.0),
        ("s", 1_000_000_000.0),
        ("h", 3_600_000_000_000.0),
        ("d", 86_400_000_000_000.0),
    ];
    for (suffix, scale) in SUFFIXES {
        if let Some(number) = token.strip_suffix(suffix) {
            // "ns", "us", "ms", and "min" must match before bare "s".
            let value = number.trim().parse::<f64>().ok()?;
            #[allow(clippy::cast_possible_truncation)]
            return Some(Duration::nanoseconds((value * scale) as i64));
        }
    }
    None
}

impl FromStr for Data {
    type Err = TelemarkError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parser = Parser::new(s);
        let value = parser.parse_value()?;
        parser.skip_ws();
        if parser.rest().is_empty() {
            Ok(value)
        } else {
            Err(parse_error(s, "data value"))
        }
    }
}
