//! Bit-level genetic operators.
//!
//! A chromosome is treated as one continuous bit string of
//! `genes.len() * GENE_BITS` bits, most significant bit of the first gene
//! first. The operators work on gene slices and respect the gene
//! boundaries inside that string.
//!
//! # Crossover
//!
//! - [`crossover_fulcrum`]: single-point crossover at a given bit offset
//! - [`crossover`]: single-point crossover at a random bit offset
//!
//! # Mutation
//!
//! - [`mutate_genes`]: independent bit flips, O(n)
//! - [`rotate_genes`]: cyclic left rotation of the whole bit string, O(n)

use crate::chromosome::Chromosome;
use crate::error::OperatorError;
use crate::genes::{Gene, GENE_BITS, GENE_MASK};
use rand::Rng;

const BITS: usize = GENE_BITS as usize;

// ============================================================================
// Crossover operators
// ============================================================================

/// Single-point crossover of two gene sequences at bit offset `fulcrum`.
///
/// # Algorithm
///
/// 1. Genes wholly left of the fulcrum keep their own parent's bits
/// 2. Genes wholly right of the fulcrum are swapped between the parents
/// 3. The gene the fulcrum falls inside is split: its high `fulcrum %
///    GENE_BITS` bits come from its own parent, the rest from the other
///
/// # Errors
/// - [`OperatorError::ChromosomeLengthMismatch`] if `a` and `b` differ in length
/// - [`OperatorError::InvalidFulcrum`] if `fulcrum` is not below the total bit count
pub fn crossover_genes(
    a: &[Gene],
    b: &[Gene],
    fulcrum: usize,
) -> Result<(Vec<Gene>, Vec<Gene>), OperatorError> {
    if a.len() != b.len() {
        return Err(OperatorError::ChromosomeLengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let total_bits = a.len() * BITS;
    if fulcrum >= total_bits {
        return Err(OperatorError::InvalidFulcrum {
            fulcrum,
            total_bits,
        });
    }

    let split = fulcrum / BITS;
    let bits = (fulcrum % BITS) as u32;
    let tail = if bits > 0 { split + 1 } else { split };

    let mut left = a.to_vec();
    let mut right = b.to_vec();
    left[tail..].copy_from_slice(&b[tail..]);
    right[tail..].copy_from_slice(&a[tail..]);

    if bits > 0 {
        let mask_right = GENE_MASK >> bits;
        let mask_left = !mask_right & GENE_MASK;
        left[split] = (a[split] & mask_left) | (b[split] & mask_right);
        right[split] = (b[split] & mask_left) | (a[split] & mask_right);
    }

    Ok((left, right))
}

/// Crosses two chromosomes at bit offset `fulcrum`.
///
/// See [`crossover_genes`] for the algorithm and errors.
///
/// # Examples
///
/// ```
/// use u_genexpr::{operators, Simulation, SimulationParams};
///
/// let sim = Simulation::new(SimulationParams::default()).unwrap();
/// let a = sim.chromosome_from_gene_string("11111").unwrap();
/// let b = sim.chromosome_from_gene_string("00000").unwrap();
///
/// let (a, b) = operators::crossover_fulcrum(&a, &b, 3).unwrap();
/// assert_eq!(a.to_string(), "11100");
/// assert_eq!(b.to_string(), "00011");
/// ```
pub fn crossover_fulcrum(
    a: &Chromosome,
    b: &Chromosome,
    fulcrum: usize,
) -> Result<(Chromosome, Chromosome), OperatorError> {
    let (left, right) = crossover_genes(a.genes(), b.genes(), fulcrum)?;
    Ok((a.derive(left), b.derive(right)))
}

/// Crosses two chromosomes at a uniformly random bit offset.
pub fn crossover<R: Rng + ?Sized>(
    a: &Chromosome,
    b: &Chromosome,
    rng: &mut R,
) -> Result<(Chromosome, Chromosome), OperatorError> {
    let total_bits = a.len() * BITS;
    let fulcrum = if total_bits == 0 {
        0
    } else {
        rng.random_range(0..total_bits)
    };
    crossover_fulcrum(a, b, fulcrum)
}

// ============================================================================
// Mutation operators
// ============================================================================

/// Flips each bit of each gene independently with probability `rate`.
pub fn mutate_genes<R: Rng + ?Sized>(genes: &mut [Gene], rate: f64, rng: &mut R) {
    for gene in genes.iter_mut() {
        for bit in (0..GENE_BITS).rev() {
            if rng.random::<f64>() < rate {
                *gene ^= 1 << bit;
            }
        }
    }
}

/// Rotates the bit string left by `n` bits, wrapping into the last gene.
///
/// `n` is reduced modulo the total bit count.
///
/// # Algorithm
///
/// 1. Rotate whole genes left by `n / GENE_BITS`
/// 2. Shift every gene left by the remaining `n % GENE_BITS` bits, filling
///    its low bits from the high bits of the next gene; the last gene takes
///    them from the first gene as it was before this step
pub fn rotate_genes(genes: &mut [Gene], n: usize) {
    let len = genes.len();
    if len == 0 {
        return;
    }

    let n = n % (len * BITS);
    genes.rotate_left(n / BITS);

    let bits = (n % BITS) as u32;
    if bits == 0 {
        return;
    }

    let carry = genes[0] >> (GENE_BITS - bits);
    for i in 0..len - 1 {
        genes[i] = ((genes[i] << bits) | (genes[i + 1] >> (GENE_BITS - bits))) & GENE_MASK;
    }
    genes[len - 1] = ((genes[len - 1] << bits) | carry) & GENE_MASK;
}
