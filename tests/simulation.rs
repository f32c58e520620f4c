//! End-to-end behavior of the public API.

use rand::rngs::StdRng;
use rand::SeedableRng;
use u_genexpr::pool::Pool;
use u_genexpr::{
    operators, BigFloat, EvalError, FitnessScorer, Individual, PopulationMember, Selector,
    Simulation, SimulationParams,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn params() -> SimulationParams {
    SimulationParams::small()
        .with_population_size(50)
        .with_evaluation_workers(0)
        .with_generation_workers(0)
        .with_seed(2024)
}

fn is_exact_solution(sim: &Simulation, member: &PopulationMember) -> bool {
    let target = sim.target().expect("initialized");
    FitnessScorer::is_sentinel(member.fitness())
        && member.chromosome().evaluate().is_ok_and(|v| v == target)
}

// ---- Decoding ----

#[test]
fn test_decode_examples() {
    let sim = Simulation::new(params()).unwrap();
    let cases = [
        ("1+2", "+++", "1+2"),
        ("02", "-+", "2"),
        ("1234", "+++-", "123"),
        ("+1+2", "++++", "+1+2"),
        ("+1?+2", "++?++", "+1+2"),
    ];
    for (input, validity, expression) in cases {
        let c = sim.encode_chromosome(input, true).unwrap();
        let decoded = c.decode();
        assert_eq!(decoded.validity, validity, "{input}");
        assert_eq!(decoded.expression, expression, "{input}");
    }

    let value = |expr: &str| sim.encode_expression(expr).unwrap().evaluate().map(BigFloat::to_f64);
    assert_eq!(value("+1+2"), Ok(3.0));
    assert_eq!(value("-1"), Ok(-1.0));
    assert_eq!(value("7/0"), Err(EvalError::DivisionByZero));
}

#[test]
fn test_decode_is_idempotent() {
    let sim = Simulation::new(params()).unwrap();
    for _ in 0..100 {
        let c = sim.random_chromosome();
        let first = c.decode().clone();
        assert_eq!(&first, c.decode());

        let copy = sim.chromosome_from_gene_string(&c.to_string()).unwrap();
        assert_eq!(&first, copy.decode());
        assert_eq!(first.validity.len(), c.len());
    }
}

// ---- Operators ----

#[test]
fn test_operator_examples() {
    let sim = Simulation::new(params()).unwrap();
    let g = |s: &str| sim.chromosome_from_gene_string(s).unwrap();

    let (a, b) = operators::crossover_fulcrum(&g("11111"), &g("00000"), 3).unwrap();
    assert_eq!((a.to_string(), b.to_string()), ("11100".into(), "00011".into()));

    let (a, b) = operators::crossover_fulcrum(&g("11111 11111"), &g("00000 00000"), 8).unwrap();
    assert_eq!(
        (a.to_string(), b.to_string()),
        ("11111 11100".into(), "00000 00011".into())
    );

    assert_eq!(g("10101").rotate(1).to_string(), "01011");
    assert_eq!(g("11111 00000").rotate(6).to_string(), "00001 11110");

    assert!(operators::crossover_fulcrum(&g("11111"), &g("00000"), 5).is_err());
    assert!(operators::crossover_fulcrum(&g("11111"), &g("00000 00000"), 1).is_err());
}

// ---- Selection ----

#[test]
fn test_selector_draws_everyone_once() {
    #[derive(Debug)]
    struct Candidate(usize, BigFloat);

    impl Individual for Candidate {
        fn fitness(&self) -> &BigFloat {
            &self.1
        }
    }

    let floats = Pool::new("float", Some(8), || BigFloat::zero(64));
    let mut rng = StdRng::seed_from_u64(5);

    for fitness in [[0.0, 0.0, 0.0, 0.0], [0.5, 0.0, 1.0, 0.25]] {
        let candidates: Vec<Candidate> = fitness
            .iter()
            .enumerate()
            .map(|(i, &f)| Candidate(i, BigFloat::from_f64(f, 64)))
            .collect();
        let mut selector = Selector::new(candidates, &floats).unwrap();
        let mut ids: Vec<usize> = selector.draw_many(4, &mut rng).iter().map(|c| c.0).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }
    assert_eq!(floats.outstanding(), 0);
}

// ---- Stepping ----

#[test]
fn test_generations_are_full_with_any_worker_count() {
    init_logger();
    for (generation, evaluation) in [(0, 0), (0, 3), (2, 0), (4, 4)] {
        let params = params()
            .with_population_size(20)
            .with_generation_workers(generation)
            .with_evaluation_workers(evaluation);
        let mut sim = Simulation::new(params).unwrap();
        sim.init_from_int(5555);

        for _ in 0..10 {
            sim.step().unwrap();
            assert_eq!(sim.population().len(), 20);
            for member in sim.population() {
                assert_eq!(member.chromosome().len(), 20);
                assert_eq!(member.chromosome().decode().validity.len(), 20);
                let fitness = member.fitness();
                assert!(!fitness.is_negative());
                assert!(*fitness <= BigFloat::from_i64(1, 64));
            }
        }
        assert_eq!(sim.iteration(), 10);
    }
}

#[test]
fn test_auto_workers() {
    let mut sim = Simulation::new(params().with_population_size(16).with_auto_workers()).unwrap();
    sim.init_from_int(77);
    for _ in 0..5 {
        sim.step().unwrap();
    }
    assert_eq!(sim.population().len(), 16);
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let genes_after = |steps: usize| {
        let mut sim = Simulation::new(params()).unwrap();
        sim.init_from_int(98_765);
        for _ in 0..steps {
            sim.step().unwrap();
        }
        sim.population()
            .iter()
            .map(|m| m.chromosome().to_string())
            .collect::<Vec<_>>()
    };
    assert_eq!(genes_after(25), genes_after(25));

    let initial = |seed: u64| {
        let mut sim = Simulation::new(params().with_seed(seed)).unwrap();
        sim.init_from_int(98_765);
        sim.population()
            .iter()
            .map(|m| m.chromosome().to_string())
            .collect::<Vec<_>>()
    };
    assert_eq!(initial(7), initial(7));
    assert_ne!(initial(7), initial(8));
}

#[test]
fn test_exact_match_reported_in_same_step() {
    init_logger();
    let mut sim = Simulation::new(params()).unwrap();
    sim.init_from_int(42);

    let mut solved = false;
    for _ in 0..5_000 {
        let reported = sim.step().unwrap();
        let exact_now = sim.population().iter().any(|m| is_exact_solution(&sim, m));
        assert_eq!(reported, solved || exact_now);
        if reported {
            solved = true;
            break;
        }
    }
    assert!(solved, "42 not reached in 5000 iterations");

    let solution = &sim.solutions()[0];
    assert_eq!(solution.evaluate().unwrap().to_string(), "42");
    let member = sim
        .population()
        .iter()
        .find(|m| m.chromosome() == solution)
        .expect("solution is in the current population");
    assert_eq!(*member.fitness(), BigFloat::from_i64(1, 128));
}

#[test]
fn test_run_large_precision_target() {
    init_logger();
    let params = SimulationParams::large()
        .with_population_size(20)
        .with_evaluation_workers(0)
        .with_generation_workers(0)
        .with_seed(1);
    let mut sim = Simulation::new(params).unwrap();
    sim.init(&"98765432101234567".parse().unwrap());
    assert_eq!(sim.target().unwrap().to_string(), "98765432101234567");

    let summary = sim.run(20).unwrap();
    assert_eq!(summary.iterations, 20);
    for member in sim.population() {
        assert_eq!(member.chromosome().len(), 80);
    }
}
