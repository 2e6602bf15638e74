//! Dockerfile 命令のトークナイザ
//!
//! セル1つ分のテキストを論理行（継続行 `\` を連結した1命令）に分け、
//! クォート・エスケープを考慮してトークンに分割する。各トークンは
//! セル内のバイト範囲を保持しており、書き換え時は該当範囲だけを差し替える。

use std::ops::Range;

/// 1トークン
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// クォートとエスケープを外した値
    pub value: String,
    /// セル内のバイト範囲（元の表記のまま）
    pub span: Range<usize>,
}

/// `--name=value` 形式のフラグ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag<'a> {
    pub name: &'a str,
    pub value: Option<&'a str>,
    /// 値部分のセル内バイト範囲（クォートを含む）
    pub value_span: Option<Range<usize>>,
}

/// 論理行1つ分の命令
#[derive(Debug, Clone)]
pub struct Instruction<'a> {
    source: &'a str,
    range: Range<usize>,
    tokens: Vec<Token>,
    comment: bool,
}

impl<'a> Instruction<'a> {
    /// 元のテキスト（継続行を含む）
    pub fn text(&self) -> &'a str {
        &self.source[self.range.clone()]
    }

    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn is_comment(&self) -> bool {
        self.comment
    }

    /// 大文字に揃えた命令キーワード
    pub fn keyword(&self) -> Option<String> {
        if self.comment {
            return None;
        }
        self.tokens.first().map(|t| t.value.to_ascii_uppercase())
    }

    pub fn is(&self, keyword: &str) -> bool {
        self.keyword()
            .is_some_and(|k| k.eq_ignore_ascii_case(keyword))
    }

    /// キーワード直後に並ぶフラグ。最初の非フラグトークンで打ち切る
    pub fn flags(&self) -> Vec<Flag<'_>> {
        self.tokens
            .iter()
            .skip(1)
            .take_while(|t| t.value.starts_with("--"))
            .map(|t| {
                let (name, value) = match t.value[2..].split_once('=') {
                    Some((name, value)) => (name, Some(value)),
                    None => (&t.value[2..], None),
                };
                let value_span = value.and_then(|_| {
                    self.source[t.span.clone()]
                        .find('=')
                        .map(|eq| t.span.start + eq + 1..t.span.end)
                });
                Flag {
                    name,
                    value,
                    value_span,
                }
            })
            .collect()
    }

    /// 名前を大文字小文字を区別せずに探す
    pub fn flag(&self, name: &str) -> Option<Flag<'_>> {
        self.flags()
            .into_iter()
            .find(|flag| flag.name.eq_ignore_ascii_case(name))
    }

    /// フラグ以外の引数
    pub fn arguments(&self) -> &[Token] {
        let skip = 1 + self
            .tokens
            .iter()
            .skip(1)
            .take_while(|t| t.value.starts_with("--"))
            .count();
        self.tokens.get(skip..).unwrap_or(&[])
    }

    /// `FROM <image> [AS <name>]` のイメージ参照
    pub fn base_image(&self) -> Option<&Token> {
        if !self.is("FROM") {
            return None;
        }
        self.arguments().first()
    }

    /// `FROM <image> AS <name>` の `<name>`
    pub fn stage_alias(&self) -> Option<&str> {
        if !self.is("FROM") {
            return None;
        }
        match self.arguments() {
            [_, as_kw, alias, ..] if as_kw.value.eq_ignore_ascii_case("as") => {
                Some(alias.value.as_str())
            }
            _ => None,
        }
    }
}

/// セルを論理行ごとの命令に分割する
///
/// 空行は捨て、`#` で始まる行はコメント命令として残す。継続行の途中に
/// あるコメント行・空行は Docker と同じく無視する。
pub fn parse(source: &str) -> Vec<Instruction<'_>> {
    let mut instructions = Vec::new();
    let mut current: Option<(usize, Tokenizer)> = None;
    let mut offset = 0;

    for line in source.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        let content = line.trim_end_matches(['\n', '\r']);
        let trimmed = content.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            if current.is_none() && trimmed.starts_with('#') {
                let lead = content.len() - content.trim_start().len();
                let end = line_start + content.trim_end().len();
                instructions.push(Instruction {
                    source,
                    range: line_start + lead..end,
                    tokens: Vec::new(),
                    comment: true,
                });
            }
            continue;
        }

        let (start, mut tokenizer) = current.take().unwrap_or_else(|| {
            let lead = content.len() - content.trim_start().len();
            (line_start + lead, Tokenizer::default())
        });

        let body = content.trim_end();
        match body.strip_suffix('\\') {
            Some(rest) => {
                tokenizer.feed(rest, line_start);
                current = Some((start, tokenizer));
            }
            None => {
                tokenizer.feed(body, line_start);
                instructions.push(Instruction {
                    source,
                    range: start..line_start + body.len(),
                    tokens: tokenizer.finish(),
                    comment: false,
                });
            }
        }
    }

    // 最終行が継続記号で終わっている場合
    if let Some((start, tokenizer)) = current {
        instructions.push(Instruction {
            source,
            range: start..source.trim_end().len().max(start),
            tokens: tokenizer.finish(),
            comment: false,
        });
    }

    instructions
}

/// 1命令分の文字列をトークンに分ける
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer::default();
    tokenizer.feed(text, 0);
    tokenizer.finish()
}

#[derive(Debug, Default)]
struct Tokenizer {
    tokens: Vec<Token>,
    value: String,
    start: Option<usize>,
    end: usize,
    quote: Option<char>,
}

impl Tokenizer {
    /// `text` は `base` から始まるセル内の断片。呼び出しをまたいで状態を引き継ぐ
    fn feed(&mut self, text: &str, base: usize) {
        let mut chars = text.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            let at = base + i;
            match self.quote {
                Some(q) if c == q => {
                    self.quote = None;
                    self.end = at + c.len_utf8();
                }
                Some('"') if c == '\\' => {
                    self.end = at + 1;
                    match chars.peek() {
                        Some(&(j, next)) if next == '"' || next == '\\' => {
                            self.value.push(next);
                            self.end = base + j + next.len_utf8();
                            chars.next();
                        }
                        _ => self.value.push(c),
                    }
                }
                Some(_) => {
                    self.value.push(c);
                    self.end = at + c.len_utf8();
                }
                None if c.is_whitespace() => self.flush(),
                None => {
                    self.start.get_or_insert(at);
                    self.end = at + c.len_utf8();
                    match c {
                        '\'' | '"' => self.quote = Some(c),
                        '\\' => {
                            if let Some((j, next)) = chars.next() {
                                self.value.push(next);
                                self.end = base + j + next.len_utf8();
                            } else {
                                self.value.push(c);
                            }
                        }
                        _ => self.value.push(c),
                    }
                }
            }
        }
    }

    fn flush(&mut self) {
        if let Some(start) = self.start.take() {
            self.tokens.push(Token {
                value: std::mem::take(&mut self.value),
                span: start..self.end,
            });
        }
    }

    fn finish(mut self) -> Vec<Token> {
        // 閉じられていないクォートはそのまま値に含める
        self.quote = None;
        self.flush();
        self.tokens
    }
}
