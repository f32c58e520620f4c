//! Population types.
//!
//! [`Individual`] is the seam between the selector and whatever it draws
//! from: anything that exposes a fitness can be selected. The simulation
//! stores its generation as a [`Population`] of [`PopulationMember`]s.

use crate::chromosome::Chromosome;
use crate::float::BigFloat;

/// A candidate that carries a fitness score.
///
/// Higher fitness is better. The sentinel fitness `1` marks an exact
/// solution.
pub trait Individual {
    /// Returns this candidate's fitness.
    fn fitness(&self) -> &BigFloat;
}

impl<I: Individual + ?Sized> Individual for &I {
    fn fitness(&self) -> &BigFloat {
        (**self).fitness()
    }
}

/// A scored chromosome.
#[derive(Debug, Clone)]
pub struct PopulationMember {
    chromosome: Chromosome,
    fitness: BigFloat,
}

impl PopulationMember {
    pub fn new(chromosome: Chromosome, fitness: BigFloat) -> Self {
        Self {
            chromosome,
            fitness,
        }
    }

    pub fn chromosome(&self) -> &Chromosome {
        &self.chromosome
    }

    pub fn fitness(&self) -> &BigFloat {
        &self.fitness
    }
}

impl Individual for PopulationMember {
    fn fitness(&self) -> &BigFloat {
        &self.fitness
    }
}

/// One generation of scored chromosomes, in creation order.
#[derive(Debug, Clone, Default)]
pub struct Population {
    members: Vec<PopulationMember>,
}

impl Population {
    pub fn new(members: Vec<PopulationMember>) -> Self {
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[PopulationMember] {
        &self.members
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PopulationMember> {
        self.members.iter()
    }

    /// Members ordered by ascending fitness.
    ///
    /// The sort is stable, so equal-fitness members keep creation order.
    pub fn sorted_by_fitness(&self) -> Vec<&PopulationMember> {
        let mut sorted: Vec<&PopulationMember> = self.members.iter().collect();
        sorted.sort_by(|a, b| a.fitness.cmp(&b.fitness));
        sorted
    }

    /// The member with the highest fitness; the first one on ties.
    pub fn fittest(&self) -> Option<&PopulationMember> {
        self.members
            .iter()
            .reduce(|best, m| if m.fitness > best.fitness { m } else { best })
    }
}

impl<'a> IntoIterator for &'a Population {
    type Item = &'a PopulationMember;
    type IntoIter = std::slice::Iter<'a, PopulationMember>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Simulation, SimulationParams};

    fn members(fitness: &[i64]) -> Population {
        let sim = Simulation::new(
            SimulationParams::small()
                .with_population_size(2)
                .with_generation_workers(0)
                .with_seed(3),
        )
        .unwrap();
        Population::new(
            fitness
                .iter()
                .map(|&f| PopulationMember::new(sim.random_chromosome(), BigFloat::from_i64(f, 64)))
                .collect(),
        )
    }

    #[test]
    fn test_sorted_ascending() {
        let pop = members(&[3, -1, 2, 0]);
        let sorted: Vec<f64> = pop
            .sorted_by_fitness()
            .iter()
            .map(|m| m.fitness().to_f64())
            .collect();
        assert_eq!(sorted, vec![-1.0, 0.0, 2.0, 3.0]);
        // Creation order is untouched.
        assert_eq!(pop.members()[0].fitness().to_f64(), 3.0);
    }

    #[test]
    fn test_fittest_prefers_first_on_tie() {
        let pop = members(&[1, 5, 5, 2]);
        let best = pop.fittest().unwrap();
        assert!(std::ptr::eq(best, &pop.members()[1]));
    }

    #[test]
    fn test_empty() {
        let pop = Population::default();
        assert!(pop.is_empty());
        assert!(pop.fittest().is_none());
        assert!(pop.sorted_by_fitness().is_empty());
    }

    #[test]
    fn test_individual_through_reference() {
        let pop = members(&[4]);
        let member = &pop.members()[0];
        let by_ref: &PopulationMember = member;
        assert_eq!(Individual::fitness(&by_ref).to_f64(), 4.0);
    }
}
