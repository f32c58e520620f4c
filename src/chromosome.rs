//! Chromosomes: fixed-length gene sequences with a memoized decode.

use crate::context::Context;
use crate::decode::{DecodeResult, Validity};
use crate::error::EvalError;
use crate::float::BigFloat;
use crate::genes::{Gene, GENE_BITS};
use crate::operators;
use rand::Rng;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A candidate expression encoded as genes.
///
/// Chromosomes are immutable; the genetic operators return new instances.
/// The first call to [`decode`](Self::decode) decodes and evaluates the
/// genes, and later calls (from any thread) return the same result.
///
/// Chromosomes are created through a [`Simulation`](crate::Simulation),
/// whose parameters control decoding.
#[derive(Clone)]
pub struct Chromosome {
    genes: Vec<Gene>,
    ctx: Arc<Context>,
    decoded: OnceLock<DecodeResult>,
}

impl Chromosome {
    pub(crate) fn with_genes(genes: Vec<Gene>, ctx: Arc<Context>) -> Self {
        Self {
            genes,
            ctx,
            decoded: OnceLock::new(),
        }
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Decodes the genes, or returns the memoized result.
    pub fn decode(&self) -> &DecodeResult {
        self.decoded.get_or_init(|| self.ctx.decode(&self.genes))
    }

    /// Value of the decoded expression.
    pub fn evaluate(&self) -> Result<&BigFloat, EvalError> {
        self.decode().evaluate()
    }

    /// Returns a copy with each bit flipped with probability `rate`.
    ///
    /// Draws from the simulation's generator pool.
    pub fn mutate(&self, rate: f64) -> Self {
        let mut rng = self.ctx.rngs.checkout();
        self.mutate_with_rng(rate, &mut *rng)
    }

    pub fn mutate_with_rng<R: Rng + ?Sized>(&self, rate: f64, rng: &mut R) -> Self {
        let mut genes = self.genes.clone();
        operators::mutate_genes(&mut genes, rate, rng);
        self.derive(genes)
    }

    /// Returns a copy with the whole bit string rotated left by `n` bits.
    pub fn rotate(&self, n: usize) -> Self {
        let mut genes = self.genes.clone();
        operators::rotate_genes(&mut genes, n);
        self.derive(genes)
    }

    /// A new chromosome from the same simulation.
    pub(crate) fn derive(&self, genes: Vec<Gene>) -> Self {
        Self::with_genes(genes, Arc::clone(&self.ctx))
    }

    /// Multi-line description: the bits, each gene's contribution, the
    /// expression and its value.
    ///
    /// ```text
    /// 00001 00100 11100 00010
    /// 11111 +++++   ?   22222
    ///   1+2
    ///     = 3
    /// ```
    pub fn verbose_string(&self) -> String {
        let decoded = self.decode();
        let value = match decoded.evaluate() {
            Ok(value) => value.to_string(),
            Err(_) => "ERROR".to_string(),
        };

        let gene_width = GENE_BITS as usize;
        let left = " ".repeat(gene_width / 2);
        let right = " ".repeat(gene_width / 2 - usize::from(gene_width % 2 == 0));

        let mut raw = decoded.raw_expression.chars();
        let exploded: Vec<String> = decoded
            .validity
            .bytes()
            .map(|mark| {
                if mark == Validity::Unknown as u8 {
                    return format!("{left}?{right}");
                }
                let symbol = raw.next().unwrap_or(' ');
                if mark == Validity::Valid as u8 {
                    symbol.to_string().repeat(gene_width)
                } else {
                    format!("{left}{symbol}{right}")
                }
            })
            .collect();

        format!(
            "{self}\n{}\n  {}\n    = {value}",
            exploded.join(" "),
            decoded.expression
        )
    }
}

impl PartialEq for Chromosome {
    fn eq(&self, other: &Self) -> bool {
        self.genes == other.genes
    }
}

impl Eq for Chromosome {}

impl fmt::Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, gene) in self.genes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{gene:0width$b}", width = GENE_BITS as usize)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Chromosome").field(&self.to_string()).finish()
    }
}
