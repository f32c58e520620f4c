//! Gene ↔ symbol table.
//!
//! A gene is a [`GENE_BITS`]-wide bit pattern. Most patterns decode to a
//! digit or one of `+ - * /`; several patterns alias the same symbol so that
//! a single bit flip tends to land on a nearby symbol rather than an
//! arbitrary one. Patterns with no symbol decode as unknown and are skipped
//! by the decoder.

/// One gene. Only the low [`GENE_BITS`] bits are used.
pub type Gene = u8;

/// Width of a gene in bits.
pub const GENE_BITS: u32 = 5;

/// Mask selecting the bits of a gene.
pub const GENE_MASK: Gene = 0xff >> (8 - GENE_BITS);

/// Number of distinct gene patterns.
pub const GENE_PATTERNS: usize = 1 << GENE_BITS;

/// Operator symbols, in the order they are listed in expressions.
pub const OPERATORS: [u8; 4] = *b"+-*/";

/// Gene patterns that decode to no symbol.
pub const UNKNOWN_GENES: &[Gene] = &[0b11100];

const SYMBOLS: [Option<u8>; GENE_PATTERNS] = {
    let mut table = [None; GENE_PATTERNS];

    // Primary patterns, arranged so one-bit flips move between neighbours.
    table[0b00100] = Some(b'+');
    table[0b01110] = Some(b'-');
    table[0b01010] = Some(b'*');
    table[0b10101] = Some(b'/');
    table[0b00000] = Some(b'0');
    table[0b00001] = Some(b'1');
    table[0b00010] = Some(b'2');
    table[0b00011] = Some(b'2');
    table[0b00111] = Some(b'3');
    table[0b01111] = Some(b'4');
    table[0b11111] = Some(b'5');
    table[0b11110] = Some(b'6');
    table[0b11101] = Some(b'7');
    table[0b11000] = Some(b'8');
    table[0b11001] = Some(b'8');
    table[0b10001] = Some(b'9');
    table[0b10000] = Some(b'0');

    // Fill-ins for the remaining patterns.
    table[0b00101] = Some(b'0');
    table[0b00110] = Some(b'1');
    table[0b01000] = Some(b'2');
    table[0b01001] = Some(b'3');
    table[0b01011] = Some(b'4');
    table[0b01100] = Some(b'5');
    table[0b01101] = Some(b'6');
    table[0b10010] = Some(b'7');
    table[0b10011] = Some(b'8');
    table[0b10100] = Some(b'9');
    table[0b10110] = Some(b'+');
    table[0b10111] = Some(b'-');
    table[0b11010] = Some(b'*');
    table[0b11011] = Some(b'/');

    table
};

/// Symbol encoded by `gene`, or `None` for unknown patterns.
///
/// Bits above [`GENE_BITS`] are ignored.
pub fn symbol_of(gene: Gene) -> Option<u8> {
    SYMBOLS[(gene & GENE_MASK) as usize]
}

/// Canonical gene for `symbol`, used when encoding expressions.
pub fn gene_of(symbol: u8) -> Option<Gene> {
    let gene = match symbol {
        b'+' => 0b00100,
        b'-' => 0b01110,
        b'*' => 0b01010,
        b'/' => 0b10101,
        b'0' => 0b00000,
        b'1' => 0b00001,
        b'2' => 0b00010,
        b'3' => 0b00111,
        b'4' => 0b01111,
        b'5' => 0b11111,
        b'6' => 0b11110,
        b'7' => 0b11101,
        b'8' => 0b11000,
        b'9' => 0b10001,
        _ => return None,
    };
    Some(gene)
}

/// Whether `symbol` is one of [`OPERATORS`].
pub fn is_operator(symbol: u8) -> bool {
    OPERATORS.contains(&symbol)
}

/// Binding strength of an operator: `+ -` bind looser than `* /`.
pub fn precedence(op: u8) -> u8 {
    match op {
        b'+' | b'-' => 0,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask() {
        assert_eq!(GENE_MASK, 0b11111);
        assert_eq!(GENE_PATTERNS, 32);
    }

    #[test]
    fn test_unknown_genes_match_table() {
        let unknown: Vec<Gene> = (0..GENE_PATTERNS as Gene)
            .filter(|&g| symbol_of(g).is_none())
            .collect();
        assert_eq!(unknown, UNKNOWN_GENES);
    }

    #[test]
    fn test_canonical_genes_round_trip() {
        for &symbol in b"0123456789+-*/" {
            let gene = gene_of(symbol).expect("every symbol has a gene");
            assert_eq!(symbol_of(gene), Some(symbol), "symbol {}", symbol as char);
        }
        assert_eq!(gene_of(b'?'), None);
        assert_eq!(gene_of(b'x'), None);
    }

    #[test]
    fn test_every_symbol_is_reachable() {
        for &symbol in b"0123456789+-*/" {
            let count = (0..GENE_PATTERNS as Gene)
                .filter(|&g| symbol_of(g) == Some(symbol))
                .count();
            assert!(count >= 1, "symbol {} has no gene", symbol as char);
        }
    }

    #[test]
    fn test_high_bits_ignored() {
        assert_eq!(symbol_of(0b1110_0001), symbol_of(0b0000_0001));
    }

    #[test]
    fn test_is_operator() {
        for op in OPERATORS {
            assert!(is_operator(op));
        }
        assert!(!is_operator(b'0'));
        assert!(!is_operator(b'?'));
    }

    #[test]
    fn test_precedence() {
        assert!(precedence(b'*') > precedence(b'+'));
        assert_eq!(precedence(b'/'), precedence(b'*'));
        assert_eq!(precedence(b'-'), precedence(b'+'));
    }
}
