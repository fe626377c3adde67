// The five dialects shipped with the engine, as data.

use crate::dialect::{
    Column, DialectConfig, Filters, FooterRule, HeaderRule, ItemPriceRule, ItemRule, Level,
    PriceMatch, Span, SubsectionMatch, TotalSource,
};

pub const SMETA_RU: &str = "Смета ру";
pub const TURBOSMETCHIK_1: &str = "Турбосметчик-1";
pub const TURBOSMETCHIK_2: &str = "Турбосметчик-2";
pub const TURBOSMETCHIK_3: &str = "Турбосметчик-3";
pub const GRANDSMETA: &str = "ГрандСМЕТА";

pub const TURBOSMETCHIK: &str = "Турбосметчик";
const ITEM_TOTAL_TEXT: &str = "Всего по позиции";

const A: Column = Column(0);
const B: Column = Column(1);
const C: Column = Column(2);
const D: Column = Column(3);
const E: Column = Column(4);
const F: Column = Column(5);
const G: Column = Column(6);
const H: Column = Column(7);
const I: Column = Column(8);
const J: Column = Column(9);
const K: Column = Column(10);
const L: Column = Column(11);
const M: Column = Column(12);
const N: Column = Column(13);
const R: Column = Column(17);
const S: Column = Column(18);
const V: Column = Column(21);
const W: Column = Column(22);
const Z: Column = Column(25);
const AB: Column = Column(27);

const fn span(start: Column, end: Column) -> Span {
    Span { start, end }
}

fn total(column: Column) -> TotalSource {
    TotalSource { column, merge: None }
}

fn total_in(column: Column, merge: Span) -> TotalSource {
    TotalSource { column, merge: Some(merge) }
}

fn footer(level: Level, span: Span, text_column: Column, prefix: &str, total: TotalSource) -> FooterRule {
    FooterRule { level, span, text_column, prefix: prefix.into(), total }
}

/// All built-in dialects, in picker order.
pub fn all() -> Vec<DialectConfig> {
    vec![
        smeta_ru(),
        turbosmetchik_1(),
        turbosmetchik_2(),
        turbosmetchik_3(),
        grandsmeta(),
    ]
}

/// Headers and footers merge across A:K. Priced rows are recognized purely by
/// which columns are populated.
pub fn smeta_ru() -> DialectConfig {
    let a_k = span(A, K);
    DialectConfig {
        name: SMETA_RU.into(),
        family: None,
        header: HeaderRule {
            span: a_k,
            text_column: A,
            section_prefix: "Раздел:".into(),
            subsection: SubsectionMatch::Prefix { prefix: "Подраздел:".into() },
        },
        footers: vec![
            footer(Level::Subsection, a_k, A, "Итого по подразделу:", total(I)),
            footer(Level::Section, a_k, A, "Итого по разделу:", total(I)),
        ],
        item_price: ItemPriceRule {
            rule: PriceMatch::ColumnPattern {
                non_empty: vec![I, K],
                empty: vec![A, B, C, D, E, F, G, H],
            },
            total: total(I),
        },
        item: ItemRule { id_column: A, columns: [A, B, C, D, E], inline_price: None },
        filters: Filters { skip_item_when_zero: Some(J), drop_zero_totals: true },
    }
}

/// Variants 1 and 2 differ only in the quantity column.
fn turbosmetchik(name: &str, quantity: Column) -> DialectConfig {
    let d_k = span(D, K);
    DialectConfig {
        name: name.into(),
        family: Some(TURBOSMETCHIK.into()),
        header: HeaderRule {
            span: span(A, W),
            text_column: A,
            section_prefix: "Раздел".into(),
            subsection: SubsectionMatch::Prefix { prefix: "Подраздел".into() },
        },
        footers: vec![
            footer(Level::Subsection, d_k, D, "Итого по подразделу", total(V)),
            footer(Level::Section, d_k, D, "Итого по разделу", total(V)),
        ],
        item_price: ItemPriceRule {
            rule: PriceMatch::MergedText {
                span: span(D, R),
                text_column: D,
                text: ITEM_TOTAL_TEXT.into(),
            },
            total: total(V),
        },
        item: ItemRule {
            id_column: A,
            columns: [A, B, D, L, quantity],
            inline_price: Some(total_in(V, span(V, W))),
        },
        filters: Filters::default(),
    }
}

pub fn turbosmetchik_1() -> DialectConfig {
    turbosmetchik(TURBOSMETCHIK_1, M)
}

pub fn turbosmetchik_2() -> DialectConfig {
    turbosmetchik(TURBOSMETCHIK_2, N)
}

/// Wider layout: headers span A:AB, totals sit in Z (often merged Z:AB).
pub fn turbosmetchik_3() -> DialectConfig {
    let e_i = span(E, I);
    let z_ab = span(Z, AB);
    DialectConfig {
        name: TURBOSMETCHIK_3.into(),
        family: Some(TURBOSMETCHIK.into()),
        header: HeaderRule {
            span: span(A, AB),
            text_column: A,
            section_prefix: "Раздел".into(),
            subsection: SubsectionMatch::Prefix { prefix: "Подраздел".into() },
        },
        footers: vec![
            footer(Level::Subsection, e_i, E, "Итого по подразделу", total(Z)),
            footer(Level::Section, e_i, E, "Итого по разделу", total(Z)),
        ],
        item_price: ItemPriceRule {
            rule: PriceMatch::MergedText {
                span: span(E, S),
                text_column: E,
                text: ITEM_TOTAL_TEXT.into(),
            },
            total: total_in(Z, z_ab),
        },
        item: ItemRule {
            id_column: A,
            columns: [A, B, E, J, M],
            inline_price: Some(total_in(Z, z_ab)),
        },
        filters: Filters::default(),
    }
}

/// Any titled A:K merge that is not a section is a subsection. Section and
/// subsection footers use different spans and total columns.
pub fn grandsmeta() -> DialectConfig {
    DialectConfig {
        name: GRANDSMETA.into(),
        family: None,
        header: HeaderRule {
            span: span(A, K),
            text_column: A,
            section_prefix: "Раздел".into(),
            subsection: SubsectionMatch::AnyText,
        },
        footers: vec![
            footer(Level::Subsection, span(D, K), D, "Итого по подразделу", total(V)),
            footer(Level::Section, span(C, H), C, "Итого по разделу", total(K)),
        ],
        item_price: ItemPriceRule {
            rule: PriceMatch::ColumnText { column: C, text: ITEM_TOTAL_TEXT.into() },
            total: total(K),
        },
        item: ItemRule {
            id_column: A,
            columns: [A, B, C, D, E],
            inline_price: Some(total(K)),
        },
        filters: Filters::default(),
    }
}
