//! Stack-trace frame extraction.
//!
//! Recognizes the frame line shapes of Python, Java, Node and .NET traces.
//! Unrecognized lines (exception messages, source echoes, blank lines) are
//! skipped, not errors; a trace is whatever the producing runtime printed.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static PY_FRAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*File "(?P<file>[^"]+)", line (?P<line>\d+), in (?P<symbol>\S+)"#).unwrap()
});
static JAVA_FRAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*at (?P<symbol>[^(]+)\((?P<file>[^:]+):(?P<line>\d+)\)").unwrap()
});
static NODE_FRAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*at (?P<symbol>\S+) \((?P<file>[^:]+):(?P<line>\d+):\d+\)").unwrap()
});
// .NET frames with debug info: "at Ns.Type.Method(args) in File.cs:line 42"
static DOTNET_FRAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*at (?P<symbol>.+?) in (?P<file>.+?):line (?P<line>\d+)").unwrap()
});
// Release-build .NET frames carry only the symbol: "at Ns.Type.Method()"
static SYMBOL_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*at\s+(?P<symbol>[\w.<>`]+)").unwrap());

/// Which runtime printed the frame line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameLanguage {
    Python,
    Java,
    Node,
    DotNet,
}

/// One parsed stack frame.
///
/// `raw` is always present and is the query text for semantic lookup when
/// the frame carries no usable file/line information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackFrame {
    pub language: FrameLanguage,
    /// The frame line exactly as it appeared in the trace
    pub raw: String,
    /// Source file named by the frame, when present
    pub file: Option<String>,
    /// 1-based line number named by the frame, when present
    pub line: Option<u32>,
    /// Function, method or fully qualified symbol
    pub symbol: Option<String>,
}

/// Extract all recognizable frames from a stack trace, in trace order.
pub fn parse_trace(trace: &str) -> Vec<StackFrame> {
    trace.lines().filter_map(parse_frame_line).collect()
}

fn parse_frame_line(line: &str) -> Option<StackFrame> {
    if let Some(caps) = PY_FRAME_RE.captures(line) {
        return Some(frame(FrameLanguage::Python, line, &caps));
    }
    if let Some(caps) = JAVA_FRAME_RE.captures(line) {
        return Some(frame(FrameLanguage::Java, line, &caps));
    }
    if let Some(caps) = NODE_FRAME_RE.captures(line) {
        return Some(frame(FrameLanguage::Node, line, &caps));
    }
    if let Some(caps) = DOTNET_FRAME_RE.captures(line) {
        return Some(frame(FrameLanguage::DotNet, line, &caps));
    }
    if let Some(caps) = SYMBOL_ONLY_RE.captures(line) {
        return Some(StackFrame {
            language: FrameLanguage::DotNet,
            raw: line.to_string(),
            file: None,
            line: None,
            symbol: Some(caps["symbol"].to_string()),
        });
    }
    None
}

fn frame(language: FrameLanguage, raw: &str, caps: &regex::Captures<'_>) -> StackFrame {
    StackFrame {
        language,
        raw: raw.to_string(),
        file: Some(caps["file"].to_string()),
        line: caps["line"].parse().ok(),
        symbol: Some(caps["symbol"].trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_python_frame() {
        let trace = "  File \"app/main.py\", line 42, in handler\n    raise ValueError(\"oops\")\n";
        let frames = parse_trace(trace);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].language, FrameLanguage::Python);
        assert_eq!(frames[0].file.as_deref(), Some("app/main.py"));
        assert_eq!(frames[0].line, Some(42));
        assert_eq!(frames[0].symbol.as_deref(), Some("handler"));
    }

    #[test]
    fn parses_java_frame() {
        let frames = parse_trace("    at com.example.MyClass.myMethod(MyClass.java:123)");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].language, FrameLanguage::Java);
        assert_eq!(frames[0].file.as_deref(), Some("MyClass.java"));
        assert_eq!(frames[0].line, Some(123));
    }

    #[test]
    fn parses_node_frame() {
        let frames = parse_trace("    at handleRequest (src/server.js:87:13)");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].language, FrameLanguage::Node);
        assert_eq!(frames[0].file.as_deref(), Some("src/server.js"));
        assert_eq!(frames[0].line, Some(87));
        assert_eq!(frames[0].symbol.as_deref(), Some("handleRequest"));
    }

    #[test]
    fn parses_dotnet_frame_with_debug_info() {
        let frames =
            parse_trace("   at My.Namespace.Type.Method(String arg) in File.cs:line 42");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].language, FrameLanguage::DotNet);
        assert_eq!(frames[0].file.as_deref(), Some("File.cs"));
        assert_eq!(frames[0].line, Some(42));
    }

    #[test]
    fn parses_symbol_only_frame() {
        let frames = parse_trace("   at Other.Type.OtherMethod()");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].file, None);
        assert_eq!(frames[0].line, None);
        assert_eq!(frames[0].symbol.as_deref(), Some("Other.Type.OtherMethod"));
    }

    #[test]
    fn skips_non_frame_lines() {
        let trace = "System.Exception: boom\n   at My.Namespace.Type.Method(File.cs:42)\n   at Other.Type.OtherMethod()\n";
        let frames = parse_trace(trace);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].file.as_deref(), Some("File.cs"));
        assert_eq!(frames[0].line, Some(42));
        assert_eq!(frames[1].file, None);
    }

    #[test]
    fn mixed_trace_keeps_order() {
        let trace = "\
  File \"a.py\", line 1, in f
    at com.example.A.b(A.java:2)
    at cb (x.js:3:4)
";
        let frames = parse_trace(trace);
        let langs: Vec<_> = frames.iter().map(|f| f.language).collect();
        assert_eq!(
            langs,
            vec![FrameLanguage::Python, FrameLanguage::Java, FrameLanguage::Node]
        );
    }

    #[test]
    fn raw_text_is_preserved_verbatim() {
        let line = "   at My.Namespace.Type.Method(File.cs:42)";
        let frames = parse_trace(line);
        assert_eq!(frames[0].raw, line);
    }
}
