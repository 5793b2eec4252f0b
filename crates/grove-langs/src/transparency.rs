//! Transparency, a macro-dataflow language.
//!
//! Covers pragmas, class-scope definitions, type specifications, structured
//! statements and operator expressions of the language. Keywords are
//! contextual: a word is only scanned as a keyword in states that accept that
//! keyword, and otherwise it is an identifier. All keywords share the node
//! kind `keyword`.

use grove_syntax::language::{GrammarBuilder, GrammarError, LexContext, Lexeme, Scanner, Symbol};
use grove_syntax::Language;
use logos::Logos;
use rustc_hash::FxHashMap;
use text_size::TextSize;

/// Bytes past a token the scanner may inspect. Scoped identifiers peek at
/// `::` and the character after it.
const LOOKAHEAD: u32 = 3;

const SIMPLE_TYPES: &[&str] = &[
    "int8", "int16", "int32", "int64", "uint8", "uint16", "uint32", "uint64", "float32",
    "float64", "codepoint", "bool", "double", "single", "int", "uint", "char", "string",
    "symbol", "regex", "match", "blob", "device", "buffer", "stream", "bitset", "idxset",
];

const ELEMENT_KINDS: &[&str] = &[
    "vector", "deque", "pqueue", "wire", "set", "ordset", "list", "table", "idxmap",
];

const BUILTINS: &[&str] = &[
    "@fwd", "@bwd", "@elt", "@ord", "@key", "@val", "@del", "@adv", "@pop", "@pophead",
    "@poptail", "@head", "@tail", "@nth", "@append", "@prepend", "@pushhead", "@pushtail",
    "@augment", "@remove", "@unique", "@cat", "@index", "@byte", "@ordinal", "@id", "@name",
    "@seek", "@tell", "@empty", "@full", "@depth", "@space", "@unused", "@flush", "@reset",
    "@accept", "@startrecording", "@stoprecording", "@isrecording", "@geterrors",
    "@seterrors", "@defined", "@refcount", "@cap", "@alignment", "@size", "@iosize", "@ms1",
    "@ls1", "@byteswap", "@tofloat", "@fromfloat", "@min", "@max", "@muladd", "@mulsub",
    "@submul", "@sort", "@schedule", "@get", "@put", "@join", "@built", "@ctcbuilt",
    "@ctcetc", "@tensor_address", "@tensor_allocate", "@tensor_bind", "@tensor_card",
    "@tensor_cast", "@tensor_dimensions", "@tensor_embed", "@tensor_empty",
    "@tensor_extract", "@tensor_import", "@tensor_index", "@tensor_index_address",
    "@tensor_index_offset", "@tensor_isdevice", "@tensor_ishost", "@tensor_length",
    "@tensor_offset", "@tensor_ondevice", "@tensor_onhost", "@tensor_ordinal",
    "@tensor_project", "@tensor_read", "@tensor_region", "@tensor_shape", "@tensor_size",
    "@tensor_stride", "@tensor_write", "@tensordims_align", "@tensordims_denormalize",
    "@tensordims_measure", "@tensordims_normalize",
];

/// Builtins numbered by a trailing `0-9`, `a`, `b`, `A` or `B`.
const USER_BUILTINS: &[&str] = &["@getuser", "@setuser", "@clruser"];

const IO_FLAGS: &[&str] = &[
    "@stdin", "@stdout", "@stderr", "@file", "@udp", "@tcp", "@tls", "@in", "@out", "@xst",
    "@new", "@crt", "@ovw", "@cli", "@srv", "@seq", "@rnd", "@mmp", "@acc", "@flx", "@le",
    "@be", "@bin", "@utf8", "@utf16", "@utf32",
];

fn is_user_builtin(text: &str) -> bool {
    USER_BUILTINS.iter().any(|prefix| {
        text.strip_prefix(prefix).is_some_and(|rest| {
            rest.len() == 1 && rest.bytes().all(|b| b.is_ascii_digit() || b"abAB".contains(&b))
        })
    })
}

fn lex_block_comment(lex: &mut logos::Lexer<TokenKind>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => false,
    }
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TokenKind {
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,
    #[regex(r"//[^\n]*", allow_greedy = true)]
    LineComment,
    #[token("/*", lex_block_comment)]
    BlockComment,

    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*(::[a-zA-Z0-9_$]+)*")]
    Word,
    #[regex(r"@[a-zA-Z_][a-zA-Z0-9_]*")]
    AtWord,
    #[regex(r"«[^»\n]+»")]
    QuotedIdent,
    #[regex(r"[0-9][0-9a-fA-Fx._]*([uUzZsS][0-9]*)?")]
    Number,
    #[regex(r#""([^"\\]|\\.)*""#)]
    String,
    #[regex(r"`([^`\\]|\\.)*`")]
    Symbol,
    #[regex(r"'([^'\\]|\\.)*'|\\u[0-9a-fA-F]+")]
    Codepoint,
    #[regex("‹[^‹›]*›")]
    Regex,
    #[regex("“[^“”]*”")]
    RawString,
    #[regex(r"<:[^:]*:")]
    Io,

    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("#")]
    Hash,
    #[token("?")]
    Question,
    #[token("??")]
    Choose,
    #[token("->")]
    Arrow,
    #[token("<-")]
    LeftArrow,
    #[token("++")]
    Increment,
    #[token("--")]
    Decrement,
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("%=")]
    PercentAssign,
    #[token("|=")]
    PipeAssign,
    #[token("&=")]
    AmpAssign,
    #[token("^=")]
    CaretAssign,
    #[token("~=")]
    TildeAssign,
    #[token("<~=")]
    SendAssign,
    #[token("~>=")]
    ReceiveAssign,
    #[token("==")]
    Eq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("<=")]
    LessEq,
    #[token(">=")]
    GreaterEq,
    #[token("<~")]
    Send,
    #[token("~>")]
    Receive,
    #[token(r"\\")]
    Backslash,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("||")]
    Or,
    #[token("&&")]
    And,
}

/// Token symbols, filled in while the grammar is declared.
#[derive(Default)]
struct Lexicon {
    tokens: FxHashMap<TokenKind, Symbol>,
    words: FxHashMap<&'static str, Symbol>,
    /// Keywords that may carry a scope prefix, like `Worker::ctor`.
    scoped: FxHashMap<&'static str, Symbol>,
    /// Builtins and I/O flags, which are never identifiers.
    at_words: FxHashMap<&'static str, Symbol>,
}

impl Lexicon {
    fn punct(&mut self, g: &mut GrammarBuilder, kind: TokenKind, text: &'static str) -> Symbol {
        let symbol = g.token(text);
        self.tokens.insert(kind, symbol);
        symbol
    }

    fn keyword(&mut self, g: &mut GrammarBuilder, text: &'static str) -> Symbol {
        let symbol = g.named_token("keyword");
        g.contextual(symbol);
        self.words.insert(text, symbol);
        symbol
    }

    fn scoped_keyword(&mut self, g: &mut GrammarBuilder, text: &'static str) -> Symbol {
        let symbol = self.keyword(g, text);
        self.scoped.insert(text, symbol);
        symbol
    }

    /// A reserved word that keeps its own text as its kind, like `int32`.
    fn word(&mut self, g: &mut GrammarBuilder, text: &'static str) -> Symbol {
        let symbol = g.token(text);
        g.contextual(symbol);
        self.words.insert(text, symbol);
        symbol
    }
}

struct TransparencyScanner {
    lexicon: Lexicon,
    identifier: Symbol,
    builtin: Symbol,
    greater: Symbol,
    greater_eq: Symbol,
}

impl TransparencyScanner {
    fn classify_word(&self, text: &str, context: &LexContext<'_>) -> Symbol {
        let words = &self.lexicon.words;
        words
            .get(text)
            .or_else(|| {
                let (_, last) = text.rsplit_once("::")?;
                self.lexicon.scoped.get(last)
            })
            .copied()
            .filter(|word| context.allows(*word))
            .unwrap_or(self.identifier)
    }

    fn classify_at_word(&self, text: &str, context: &LexContext<'_>) -> Option<Symbol> {
        if let Some(keyword) = self.lexicon.words.get(text).copied() {
            if context.allows(keyword) {
                return Some(keyword);
            }
        }
        if let Some(symbol) = self.lexicon.at_words.get(text) {
            return Some(*symbol);
        }
        is_user_builtin(text).then_some(self.builtin)
    }
}

impl Scanner for TransparencyScanner {
    fn scan(&self, text: &str, context: &LexContext<'_>) -> Option<Lexeme> {
        let mut lexer = TokenKind::lexer(text);
        let kind = lexer.next()?.ok()?;
        let span = lexer.span();
        if span.start != 0 {
            return None;
        }
        let symbol = match kind {
            TokenKind::Word => self.classify_word(lexer.slice(), context),
            TokenKind::AtWord => self.classify_at_word(lexer.slice(), context)?,
            // `vector<int32>= x` closes a type tuple before an assignment.
            TokenKind::GreaterEq if !context.allows(self.greater_eq) => {
                return Some(Lexeme::new(self.greater, TextSize::new(1), LOOKAHEAD));
            }
            kind => *self.lexicon.tokens.get(&kind)?,
        };
        let len = TextSize::try_from(span.end).ok()?;
        Some(Lexeme::new(symbol, len, LOOKAHEAD))
    }
}

/// Builds the Transparency language.
///
/// # Errors
///
/// Never in practice; the grammar is fixed.
#[allow(clippy::too_many_lines)]
pub fn grammar() -> Result<Language, GrammarError> {
    let mut g = GrammarBuilder::new("transparency");
    let mut lex = Lexicon::default();

    let whitespace = g.extra("whitespace", false);
    let comment = g.extra("comment", true);
    lex.tokens.insert(TokenKind::Whitespace, whitespace);
    lex.tokens.insert(TokenKind::LineComment, comment);
    lex.tokens.insert(TokenKind::BlockComment, comment);

    let identifier = g.named_token("identifier");
    let number = g.named_token("number_literal");
    let string = g.named_token("string_literal");
    let symbol = g.named_token("symbol_literal");
    let codepoint = g.named_token("codepoint_literal");
    let regex = g.named_token("regex_literal");
    let rawstring = g.named_token("rawstring_literal");
    let io = g.named_token("io_literal");
    let ioflag = g.named_token("ioflag_literal");
    let builtin = g.named_token("builtin");
    lex.tokens.insert(TokenKind::QuotedIdent, identifier);
    lex.tokens.insert(TokenKind::Number, number);
    lex.tokens.insert(TokenKind::String, string);
    lex.tokens.insert(TokenKind::Symbol, symbol);
    lex.tokens.insert(TokenKind::Codepoint, codepoint);
    lex.tokens.insert(TokenKind::Regex, regex);
    lex.tokens.insert(TokenKind::RawString, rawstring);
    lex.tokens.insert(TokenKind::Io, io);
    for &name in BUILTINS {
        lex.at_words.insert(name, builtin);
    }
    for &name in IO_FLAGS {
        lex.at_words.insert(name, ioflag);
    }

    let l_brace = lex.punct(&mut g, TokenKind::LBrace, "{");
    let r_brace = lex.punct(&mut g, TokenKind::RBrace, "}");
    let l_paren = lex.punct(&mut g, TokenKind::LParen, "(");
    let r_paren = lex.punct(&mut g, TokenKind::RParen, ")");
    let l_bracket = lex.punct(&mut g, TokenKind::LBracket, "[");
    let r_bracket = lex.punct(&mut g, TokenKind::RBracket, "]");
    let comma = lex.punct(&mut g, TokenKind::Comma, ",");
    let semicolon = lex.punct(&mut g, TokenKind::Semicolon, ";");
    let colon = lex.punct(&mut g, TokenKind::Colon, ":");
    let dot = lex.punct(&mut g, TokenKind::Dot, ".");
    let hash = lex.punct(&mut g, TokenKind::Hash, "#");
    let question = lex.punct(&mut g, TokenKind::Question, "?");
    let choose = lex.punct(&mut g, TokenKind::Choose, "??");
    let arrow = lex.punct(&mut g, TokenKind::Arrow, "->");
    let left_arrow = lex.punct(&mut g, TokenKind::LeftArrow, "<-");
    let increment_op = lex.punct(&mut g, TokenKind::Increment, "++");
    let decrement_op = lex.punct(&mut g, TokenKind::Decrement, "--");
    let assign = lex.punct(&mut g, TokenKind::Assign, "=");
    let compound_assigns = [
        lex.punct(&mut g, TokenKind::SendAssign, "<~="),
        lex.punct(&mut g, TokenKind::ReceiveAssign, "~>="),
        lex.punct(&mut g, TokenKind::PlusAssign, "+="),
        lex.punct(&mut g, TokenKind::MinusAssign, "-="),
        lex.punct(&mut g, TokenKind::StarAssign, "*="),
        lex.punct(&mut g, TokenKind::SlashAssign, "/="),
        lex.punct(&mut g, TokenKind::PercentAssign, "%="),
        lex.punct(&mut g, TokenKind::PipeAssign, "|="),
        lex.punct(&mut g, TokenKind::AmpAssign, "&="),
        lex.punct(&mut g, TokenKind::CaretAssign, "^="),
        lex.punct(&mut g, TokenKind::TildeAssign, "~="),
    ];
    let eq = lex.punct(&mut g, TokenKind::Eq, "==");
    let not_eq = lex.punct(&mut g, TokenKind::NotEq, "!=");
    let less = lex.punct(&mut g, TokenKind::Less, "<");
    let greater = lex.punct(&mut g, TokenKind::Greater, ">");
    let less_eq = lex.punct(&mut g, TokenKind::LessEq, "<=");
    let greater_eq = lex.punct(&mut g, TokenKind::GreaterEq, ">=");
    let send = lex.punct(&mut g, TokenKind::Send, "<~");
    let receive = lex.punct(&mut g, TokenKind::Receive, "~>");
    let backslash = lex.punct(&mut g, TokenKind::Backslash, "\\\\");
    let plus = lex.punct(&mut g, TokenKind::Plus, "+");
    let minus = lex.punct(&mut g, TokenKind::Minus, "-");
    let star = lex.punct(&mut g, TokenKind::Star, "*");
    let slash = lex.punct(&mut g, TokenKind::Slash, "/");
    let percent = lex.punct(&mut g, TokenKind::Percent, "%");
    let bang = lex.punct(&mut g, TokenKind::Bang, "!");
    let tilde = lex.punct(&mut g, TokenKind::Tilde, "~");
    let amp = lex.punct(&mut g, TokenKind::Amp, "&");
    let pipe = lex.punct(&mut g, TokenKind::Pipe, "|");
    let caret = lex.punct(&mut g, TokenKind::Caret, "^");
    let or = lex.punct(&mut g, TokenKind::Or, "||");
    let and = lex.punct(&mut g, TokenKind::And, "&&");
    g.contextual(greater_eq);

    let kw_class = lex.keyword(&mut g, "class");
    let kw_node = lex.keyword(&mut g, "node");
    let kw_circuit = lex.keyword(&mut g, "circuit");
    let kw_common = lex.keyword(&mut g, "common");
    let kw_ctor = lex.scoped_keyword(&mut g, "ctor");
    let kw_dtor = lex.scoped_keyword(&mut g, "dtor");
    let kw_fire = lex.scoped_keyword(&mut g, "fire");
    let kw_function = lex.keyword(&mut g, "function");
    let kw_entry = lex.keyword(&mut g, "entry");
    let kw_method = lex.keyword(&mut g, "method");
    let kw_var = lex.keyword(&mut g, "var");
    let kw_ref = lex.keyword(&mut g, "ref");
    let kw_constant = lex.keyword(&mut g, "constant");
    let kw_type = lex.keyword(&mut g, "type");
    let kw_enum = lex.keyword(&mut g, "enum");
    let kw_implements = lex.keyword(&mut g, "implements");
    let kw_shared = lex.keyword(&mut g, "shared");
    let kw_const = lex.keyword(&mut g, "const");
    let kw_trigger = lex.keyword(&mut g, "trigger");
    let kw_if = lex.keyword(&mut g, "if");
    let kw_else = lex.keyword(&mut g, "else");
    let kw_for = lex.keyword(&mut g, "for");
    let kw_do = lex.keyword(&mut g, "do");
    let kw_while = lex.keyword(&mut g, "while");
    let kw_switch = lex.keyword(&mut g, "switch");
    let kw_jump = lex.keyword(&mut g, "jump");
    let kw_case = lex.keyword(&mut g, "case");
    let kw_default = lex.keyword(&mut g, "default");
    let kw_return = lex.keyword(&mut g, "return");
    let kw_break = lex.keyword(&mut g, "break");
    let kw_continue = lex.keyword(&mut g, "continue");
    let kw_fork = lex.keyword(&mut g, "fork");
    let kw_spawn = lex.keyword(&mut g, "spawn");
    let kw_assert = lex.keyword(&mut g, "assert");
    let kw_internal = lex.keyword(&mut g, "@internal");
    let kw_share = lex.keyword(&mut g, "share");
    let kw_unshare = lex.keyword(&mut g, "unshare");
    let pragma_keywords = [
        lex.keyword(&mut g, "echo"),
        lex.keyword(&mut g, "expect"),
        lex.keyword(&mut g, "meta"),
        lex.keyword(&mut g, "xml"),
    ];
    let kw_true = lex.word(&mut g, "true");
    let kw_false = lex.word(&mut g, "false");
    let kw_map = lex.word(&mut g, "map");
    let kw_ordmap = lex.word(&mut g, "ordmap");
    let kw_to = lex.word(&mut g, "to");
    let kw_tensor = lex.word(&mut g, "tensor");
    let kw_in = lex.word(&mut g, "in");
    let kw_out = lex.word(&mut g, "out");

    // Definitions
    let source_file = g.rule("source_file");
    let top_level = g.hidden_rule("_top_level");
    let pragma = g.rule("pragma");
    let pragma_keyword = g.hidden_rule("_pragma_keyword");
    let class_scope_definition = g.hidden_rule("_class_scope_definition");
    let function_scope_definition = g.hidden_rule("_function_scope_definition");
    let class_definition = g.rule("class_definition");
    let class_keyword = g.hidden_rule("_class_keyword");
    let class_body = g.rule("class_body");
    let base_specifier_list = g.rule("base_specifier_list");
    let base_specifier = g.rule("base_specifier");
    let circuit_definition = g.rule("circuit_definition");
    let ctor_definition = g.rule("ctor_definition");
    let ctorinits = g.rule("ctorinits");
    let ctorinit = g.rule("ctorinit");
    let dtor_definition = g.rule("dtor_definition");
    let fire_definition = g.rule("fire_definition");
    let function_definition = g.rule("function_definition");
    let function_keyword = g.hidden_rule("_function_keyword");
    let method_definition = g.rule("method_definition");
    let method_form = g.hidden_rule("_method_form");
    let variable_definition = g.rule("variable_definition");
    let comprehension_definition = g.rule("comprehension_definition");
    let variable_keyword = g.hidden_rule("_variable_keyword");
    let variable_tail = g.hidden_rule("_variable_tail");
    let constant_definition = g.rule("constant_definition");
    let type_definition = g.rule("type_definition");
    let enum_definition = g.rule("enum_definition");
    let implements_declaration = g.rule("implements_declaration");
    let id_list = g.rule("id_list");

    // Types
    let typespec = g.rule("typespec");
    let type_qualifier = g.hidden_rule("_type_qualifier");
    let typeunit = g.hidden_rule("_typeunit");
    let simple_type = g.rule("simple_type");
    let element_type = g.rule("element_type");
    let element_kind = g.hidden_rule("_element_kind");
    let keyval_type = g.rule("keyval_type");
    let map_kind = g.hidden_rule("_map_kind");
    let rank = g.rule("rank");
    let rank_tuple = g.rule("rank_tuple");
    let tensor_type = g.rule("tensor_type");
    let trigger_type = g.rule("trigger_type");
    let direction = g.hidden_rule("_direction");
    let signature_type = g.rule("signature_type");
    let method_signature = g.rule("method_signature");
    let typetuple = g.rule("typetuple");
    let langle = g.rule("langle");
    let rangle = g.rule("rangle");
    let namedtypespec = g.rule("namedtypespec");

    // Statements
    let body = g.rule("body");
    let scope = g.rule("scope");
    let scope_item = g.hidden_rule("_scope_item");
    let executable_statement = g.hidden_rule("_executable_statement");
    let controlled = g.hidden_rule("_controlled");
    let else_controlled = g.hidden_rule("_else_controlled");
    let transfer_statement = g.hidden_rule("_transfer_statement");
    let simple_statement = g.rule("simple_statement");
    let imperative = g.hidden_rule("_imperative");
    let assignment = g.rule("assignment");
    let assign_op = g.hidden_rule("_assign_op");
    let assertion = g.rule("assertion");
    let assert_keyword = g.hidden_rule("_assert_keyword");
    let increment = g.rule("increment");
    let step_op = g.hidden_rule("_step_op");
    let predicate = g.rule("predicate");
    let if_statement = g.rule("if_statement");
    let while_statement = g.rule("while_statement");
    let do_statement = g.rule("do_statement");
    let for_statement = g.rule("for_statement");
    let for_init = g.hidden_rule("_for_init");
    let for_in_statement = g.rule("for_in_statement");
    let for_in_head = g.hidden_rule("_for_in_head");
    let for_in_source = g.hidden_rule("_for_in_source");
    let switch_statement = g.rule("switch_statement");
    let switch_keyword = g.hidden_rule("_switch_keyword");
    let labeled_statement = g.rule("labeled_statement");
    let node_instantiation = g.rule("node_instantiation");
    let circuit_instantiation = g.rule("circuit_instantiation");
    let fork_statement = g.rule("fork_statement");
    let fork_keyword = g.hidden_rule("_fork_keyword");
    let return_statement = g.rule("return_statement");
    let break_statement = g.rule("break_statement");
    let continue_statement = g.rule("continue_statement");

    // Expressions
    let expression = g.hidden_rule("_expression");
    let expression_list = g.hidden_rule("_expression_list");
    let binary_expression = g.rule("binary_expression");
    let unary_expression = g.rule("unary_expression");
    let ternary_expression = g.rule("ternary_expression");
    let qual_expression = g.rule("qual_expression");
    let qual_keyword = g.hidden_rule("_qual_keyword");
    let card_expression = g.rule("card_expression");
    let cast_expression = g.rule("cast_expression");
    let call_expression = g.rule("call_expression");
    let index_expression = g.rule("index_expression");
    let select_expression = g.rule("select_expression");
    let method_expression = g.rule("method_expression");
    let builtin_expression = g.rule("builtin_expression");
    let choose_expression = g.rule("choose_expression");
    let choice = g.hidden_rule("_choice");
    let input_expression = g.rule("input_expression");
    let output_expression = g.rule("output_expression");
    let tuple_expression = g.rule("tuple_expression");
    let bracket_expression = g.rule("bracket_expression");
    let initializer = g.rule("initializer");
    let closure = g.rule("closure");
    let literal = g.rule("literal");
    let boolean_literal = g.rule("boolean_literal");

    let definitions = g.repeat("_definitions", top_level);
    let class_items = g.repeat("_class_items", class_scope_definition);
    let more_bases = g.repeat_separated("_more_bases", comma, base_specifier);
    let more_ctorinits = g.repeat_separated("_more_ctorinits", comma, ctorinit);
    let more_ids = g.repeat_separated("_more_ids", comma, identifier);
    let more_typespecs = g.repeat_separated("_more_typespecs", comma, namedtypespec);
    let more_signatures = g.repeat_separated("_more_signatures", comma, method_signature);
    let more_choices = g.repeat_separated("_more_choices", comma, choice);
    // Non-empty, so that `{` opens a scope and an initializer alike without
    // committing to either.
    let scope_items = g.hidden_rule("_scope_items");
    g.production(scope_items, [scope_item]);
    g.production(scope_items, [scope_items, scope_item]);

    g.production(source_file, [definitions]);
    g.production(top_level, [class_scope_definition]);
    g.production(top_level, [pragma]);
    for keyword in pragma_keywords {
        g.production(pragma_keyword, [keyword]);
    }
    g.production(pragma, [hash, pragma_keyword]);
    g.production(pragma, [hash, pragma_keyword, expression]);

    for definition in [
        function_scope_definition,
        class_definition,
        method_definition,
        ctor_definition,
        dtor_definition,
        fire_definition,
        circuit_definition,
        implements_declaration,
        semicolon,
    ] {
        g.production(class_scope_definition, [definition]);
    }
    for definition in [
        function_definition,
        variable_definition,
        comprehension_definition,
        type_definition,
        constant_definition,
        enum_definition,
    ] {
        g.production(function_scope_definition, [definition]);
    }

    g.production(class_keyword, [kw_class]);
    g.production(class_keyword, [kw_node]);
    g.production(class_definition, [class_keyword, identifier, class_body]);
    g.production(
        class_definition,
        [class_keyword, identifier, colon, base_specifier_list, class_body],
    );
    g.production(class_body, [l_brace, class_items, r_brace]);
    g.production(base_specifier_list, [base_specifier, more_bases]);
    g.production(base_specifier, [identifier]);
    g.production(base_specifier, [kw_common, identifier]);

    g.production(
        circuit_definition,
        [kw_circuit, identifier, typetuple, scope],
    );
    g.production(ctor_definition, [kw_ctor, typetuple, body]);
    g.production(ctor_definition, [kw_ctor, typetuple, ctorinits, body]);
    g.production(ctorinits, [ctorinit, more_ctorinits]);
    g.production(ctorinits, [colon, ctorinit, more_ctorinits]);
    g.production(ctorinit, [identifier, tuple_expression]);
    g.production(dtor_definition, [kw_dtor, body]);
    g.production(fire_definition, [kw_fire, body]);

    g.production(function_keyword, [kw_function]);
    g.production(function_keyword, [kw_entry]);
    g.production(
        function_definition,
        [function_keyword, typetuple, identifier, typetuple, body],
    );

    // `!` marks a final method.
    g.production(method_definition, [kw_method, method_form]);
    g.production(method_definition, [kw_method, bang, method_form]);
    g.production(method_form, [identifier, colon, typespec, semicolon]);
    g.production(method_form, [typetuple, identifier, typetuple, body]);

    g.production(variable_keyword, [kw_var]);
    g.production(variable_keyword, [kw_ref]);
    g.production(variable_tail, [colon, typespec, semicolon]);
    g.production(variable_tail, [colon, typespec, assign, expression, semicolon]);
    g.production(variable_tail, [assign, expression, semicolon]);
    g.production(variable_definition, [variable_keyword, id_list, variable_tail]);
    g.production(
        comprehension_definition,
        [variable_keyword, l_paren, id_list, r_paren, variable_tail],
    );

    g.production(
        constant_definition,
        [kw_constant, identifier, assign, expression, semicolon],
    );
    g.production(
        constant_definition,
        [
            kw_constant,
            identifier,
            colon,
            typespec,
            assign,
            expression,
            semicolon,
        ],
    );
    g.production(
        type_definition,
        [kw_type, identifier, assign, typespec, semicolon],
    );
    g.production(
        enum_definition,
        [kw_enum, typespec, l_brace, id_list, r_brace],
    );
    g.production(implements_declaration, [kw_implements, typespec, semicolon]);
    g.production(id_list, [identifier, more_ids]);

    g.production(typespec, [typeunit]);
    g.production(typespec, [type_qualifier, typespec]);
    g.production(typespec, [typeunit, bracket_expression]);
    g.production(typespec, [typeunit, left_arrow, typetuple]);
    g.production(typespec, [typeunit, plus, typespec]);
    g.production(type_qualifier, [kw_shared]);
    g.production(type_qualifier, [kw_const]);
    for unit in [
        identifier,
        simple_type,
        element_type,
        keyval_type,
        typetuple,
        rank_tuple,
        tensor_type,
        trigger_type,
        signature_type,
    ] {
        g.production(typeunit, [unit]);
    }
    for &name in SIMPLE_TYPES {
        let word = lex.word(&mut g, name);
        g.production(simple_type, [word]);
    }
    for &name in ELEMENT_KINDS {
        let word = lex.word(&mut g, name);
        g.production(element_kind, [word]);
    }
    g.production(element_kind, [kw_in]);
    g.production(element_kind, [kw_out]);
    g.production(element_type, [element_kind, typetuple]);
    g.production(map_kind, [kw_map]);
    g.production(map_kind, [kw_ordmap]);
    g.production(keyval_type, [map_kind, typetuple, kw_to, typetuple]);
    g.production(rank, [l_brace, number, r_brace]);
    g.production(rank_tuple, [rank, typetuple]);
    g.production(tensor_type, [kw_tensor, rank, typetuple]);
    g.production(direction, [kw_in]);
    g.production(direction, [kw_out]);
    g.production(trigger_type, [kw_trigger, direction, typetuple]);
    g.production(signature_type, [l_bracket, r_bracket]);
    g.production(
        signature_type,
        [l_bracket, method_signature, more_signatures, r_bracket],
    );
    g.production(method_signature, [identifier, colon, typespec]);
    g.production(langle, [less]);
    g.production(rangle, [greater]);
    g.production(typetuple, [langle, rangle]);
    g.production(typetuple, [langle, namedtypespec, more_typespecs, rangle]);
    g.production(namedtypespec, [typespec]);
    g.production(namedtypespec, [typespec, identifier]);

    g.production(body, [scope]);
    g.production(body, [semicolon]);
    g.production(scope, [l_brace, r_brace]);
    g.production(scope, [l_brace, scope_items, r_brace]);
    g.production(scope_item, [function_scope_definition]);
    g.production(scope_item, [executable_statement]);
    for statement in [
        simple_statement,
        for_statement,
        for_in_statement,
        while_statement,
        do_statement,
        if_statement,
        switch_statement,
        labeled_statement,
        node_instantiation,
        circuit_instantiation,
        fork_statement,
        transfer_statement,
        body,
    ] {
        g.production(executable_statement, [statement]);
    }
    for statement in [
        scope,
        simple_statement,
        transfer_statement,
        for_statement,
        for_in_statement,
        do_statement,
        while_statement,
        switch_statement,
        semicolon,
    ] {
        g.production(controlled, [statement]);
    }
    g.production(else_controlled, [controlled]);
    g.production(else_controlled, [if_statement]);
    for statement in [return_statement, break_statement, continue_statement] {
        g.production(transfer_statement, [statement]);
    }

    g.production(simple_statement, [imperative, semicolon]);
    for kind in [assertion, assignment, increment, expression] {
        g.production(imperative, [kind]);
    }
    g.production(assert_keyword, [kw_assert]);
    g.production(assert_keyword, [kw_internal]);
    g.production(assertion, [assert_keyword, expression]);
    g.production(assignment, [expression, assign_op, expression]);
    g.production(assign_op, [assign]);
    for op in compound_assigns {
        g.production(assign_op, [op]);
    }
    g.production(step_op, [increment_op]);
    g.production(step_op, [decrement_op]);
    g.production(increment, [expression, step_op]);
    g.production(increment, [step_op, expression]);

    g.production(predicate, [l_paren, expression, r_paren]);
    g.production(if_statement, [kw_if, predicate, controlled]);
    // Shifting `else` binds it to the nearest `if`.
    g.production(
        if_statement,
        [kw_if, predicate, controlled, kw_else, else_controlled],
    )
    .prec(1);
    g.production(while_statement, [kw_while, predicate, controlled]);
    g.production(
        do_statement,
        [kw_do, controlled, kw_while, predicate, semicolon],
    );

    // The initializer is a full statement and ends in its own `;`.
    g.production(for_init, [variable_definition]);
    g.production(for_init, [simple_statement]);
    for (condition, step) in [(false, false), (true, false), (false, true), (true, true)] {
        let mut rhs = vec![kw_for, l_paren, for_init];
        if condition {
            rhs.push(expression);
        }
        rhs.push(semicolon);
        if step {
            rhs.push(imperative);
        }
        rhs.extend([r_paren, controlled]);
        g.production(for_statement, rhs);
    }
    g.production(for_in_head, [kw_for, identifier]);
    g.production(for_in_head, [kw_for, variable_keyword, identifier]);
    g.production(for_in_source, [expression]);
    g.production(for_in_source, [kw_in, expression]);
    g.production(
        for_in_statement,
        [for_in_head, for_in_source, kw_do, controlled],
    );
    g.production(for_in_statement, [for_in_head, for_in_source, body]);

    g.production(switch_keyword, [kw_switch]);
    g.production(switch_keyword, [kw_jump]);
    g.production(switch_statement, [switch_keyword, predicate, controlled]);
    g.production(labeled_statement, [identifier, colon]);
    g.production(labeled_statement, [kw_case, expression, colon]);
    g.production(labeled_statement, [kw_default, colon]);

    // An optional instance count and name precede the instantiated node.
    g.production(node_instantiation, [kw_node, expression, semicolon]);
    g.production(node_instantiation, [kw_node, number, expression, semicolon]);
    g.production(node_instantiation, [kw_node, string, expression, semicolon]);
    g.production(
        node_instantiation,
        [kw_node, number, string, expression, semicolon],
    );
    g.production(circuit_instantiation, [kw_circuit, expression, semicolon]);
    g.production(
        circuit_instantiation,
        [kw_circuit, number, expression, semicolon],
    );
    g.production(fork_keyword, [kw_fork]);
    g.production(fork_keyword, [kw_spawn]);
    g.production(fork_statement, [fork_keyword, expression, semicolon]);

    g.production(return_statement, [kw_return, semicolon]);
    g.production(return_statement, [kw_return, expression, semicolon]);
    g.production(break_statement, [kw_break, semicolon]);
    g.production(break_statement, [kw_break, identifier, semicolon]);
    g.production(continue_statement, [kw_continue, semicolon]);
    g.production(continue_statement, [kw_continue, identifier, semicolon]);

    for kind in [
        identifier,
        literal,
        initializer,
        bracket_expression,
        tuple_expression,
        builtin_expression,
        ternary_expression,
        binary_expression,
        unary_expression,
        qual_expression,
        card_expression,
        cast_expression,
        index_expression,
        select_expression,
        method_expression,
        call_expression,
        input_expression,
        output_expression,
        choose_expression,
        closure,
    ] {
        g.production(expression, [kind]);
    }
    g.production(expression_list, [expression]);
    g.production(expression_list, [expression_list, comma, expression]);

    let binary_levels = [
        (eq, 1),
        (not_eq, 1),
        (less, 1),
        (greater, 1),
        (less_eq, 1),
        (greater_eq, 1),
        (or, 2),
        (and, 2),
        (backslash, 3),
        (pipe, 4),
        (caret, 4),
        (tilde, 4),
        (amp, 4),
        (send, 5),
        (receive, 5),
        (plus, 6),
        (minus, 6),
        (star, 7),
        (slash, 7),
        (percent, 7),
    ];
    for (op, level) in binary_levels {
        g.production(binary_expression, [expression, op, expression])
            .prec_left(level);
    }
    for op in [minus, plus, bang, tilde, amp] {
        g.production(unary_expression, [op, expression]).prec_right(10);
    }
    g.production(
        ternary_expression,
        [expression, question, expression, colon, expression],
    )
    .prec_left(0);
    g.production(qual_keyword, [kw_share]);
    g.production(qual_keyword, [kw_unshare]);
    g.production(qual_expression, [qual_keyword, expression])
        .prec_right(0);
    g.production(card_expression, [pipe, expression, pipe])
        .prec_left(0);
    g.production(builtin_expression, [builtin, expression]).prec(10);

    // Postfix forms bind tighter than any prefix or infix operator.
    g.production(tuple_expression, [l_paren, r_paren]).prec(12);
    g.production(tuple_expression, [l_paren, expression_list, r_paren])
        .prec(12);
    g.production(call_expression, [expression, tuple_expression])
        .prec_left(12);
    g.production(
        call_expression,
        [typetuple, identifier, tuple_expression],
    );
    g.production(call_expression, [typetuple, string, tuple_expression]);
    g.production(cast_expression, [typetuple, tuple_expression]);
    g.production(
        index_expression,
        [expression, l_bracket, expression_list, r_bracket],
    )
    .prec_left(12);
    g.production(select_expression, [expression, dot, identifier])
        .prec_left(12);
    g.production(method_expression, [expression, arrow, identifier])
        .prec_left(12);
    g.production(
        method_expression,
        [expression, arrow, typetuple, identifier],
    )
    .prec_left(12);

    g.production(choice, [expression]);
    g.production(choice, [literal, colon, expression]);
    g.production(
        choose_expression,
        [expression, choose, l_brace, choice, more_choices, r_brace],
    );
    g.production(input_expression, [typetuple, io, expression])
        .prec_left(0);
    g.production(output_expression, [expression, io, expression])
        .prec_right(0);

    g.production(bracket_expression, [l_bracket, r_bracket]);
    g.production(bracket_expression, [l_bracket, expression_list, r_bracket]);
    g.production(initializer, [l_brace, expression_list, r_brace])
        .prec_left(11);
    g.production(initializer, [bracket_expression, l_brace, r_brace])
        .prec_left(11);
    g.production(
        initializer,
        [bracket_expression, l_brace, expression_list, r_brace],
    )
    .prec_left(11);
    g.production(closure, [typetuple, left_arrow, typetuple, scope]);
    g.production(closure, [typetuple, identifier, typetuple]);

    for kind in [
        number,
        string,
        symbol,
        codepoint,
        boolean_literal,
        regex,
        rawstring,
        io,
        ioflag,
    ] {
        g.production(literal, [kind]);
    }
    g.production(boolean_literal, [kw_true]);
    g.production(boolean_literal, [kw_false]);

    g.missing_cost(identifier, 2);
    g.start(source_file);

    g.build(TransparencyScanner {
        lexicon: lex,
        identifier,
        builtin,
        greater,
        greater_eq,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_builds() {
        let language = grammar().unwrap();
        assert_eq!(language.name(), "transparency");
        assert!(language.table().state_count() > 100);
        assert!(language.table().lex_mode_count() > 1);
    }

    #[test]
    fn test_keywords_share_a_kind() {
        let language = grammar().unwrap();
        let keyword = language.symbol_for_name("keyword").unwrap();
        assert!(language.is_named(keyword));
        assert!(language.is_terminal(keyword));
    }
}
