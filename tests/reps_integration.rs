// REPS Integration Tests
//
// End-to-end use of the dual optimizer against distribution collaborators,
// and the episodic agent on seeded synthetic tasks.

#[cfg(test)]
mod reps_integration_tests {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;
    use reps::{
        ConvergencePolicy, Distribution, DualOptimizer, Episode, GaussianDiagonalDistribution,
        GaussianDistribution, Reps, RepsConfig, RepsError, SolverConfig,
    };

    /// Records what the optimizer hands to the distribution.
    #[derive(Default)]
    struct RecordingSink {
        mean: Vec<f64>,
        calls: Vec<(Vec<Vec<f64>>, Vec<f64>)>,
    }

    impl Distribution for RecordingSink {
        fn dim(&self) -> usize {
            self.mean.len()
        }

        fn mean(&self) -> &[f64] {
            &self.mean
        }

        fn sample(&self, _rng: &mut impl Rng) -> Vec<f64> {
            self.mean.clone()
        }

        fn log_pdf(&self, _theta: &[f64]) -> f64 {
            0.0
        }

        fn entropy(&self) -> f64 {
            0.0
        }

        fn mle(&mut self, theta: &[Vec<f64>], weights: &[f64]) -> reps::Result<()> {
            self.calls.push((theta.to_vec(), weights.to_vec()));
            Ok(())
        }
    }

    fn sphere(theta: &[f64], target: &[f64]) -> f64 {
        -theta
            .iter()
            .zip(target)
            .map(|(x, t)| (x - t).powi(2))
            .sum::<f64>()
    }

    // =========================================================================
    // DualOptimizer against a distribution sink
    // =========================================================================

    #[test]
    fn test_update_passes_features_through_unchanged() {
        let opt = DualOptimizer::new(1.0).unwrap();
        let mut sink = RecordingSink::default();
        let theta = vec![vec![0.1, 0.2], vec![0.3, 0.4], vec![0.5, 0.6]];

        let sol = opt.update(&[1.0, 2.0, 3.0], &theta, &mut sink).unwrap();

        assert_eq!(sink.calls.len(), 1);
        let (seen_theta, seen_weights) = &sink.calls[0];
        assert_eq!(seen_theta, &theta);
        assert_eq!(seen_weights, &sol.weights);
        assert_eq!(seen_weights[2], 1.0);
    }

    #[test]
    fn test_failed_update_never_reaches_sink() {
        let opt = DualOptimizer::new(1.0).unwrap();
        let mut sink = RecordingSink::default();

        assert!(matches!(
            opt.update(&[], &[], &mut sink),
            Err(RepsError::EmptyBatch)
        ));
        assert!(matches!(
            opt.update(&[1.0, f64::NAN], &[vec![], vec![]], &mut sink),
            Err(RepsError::NonFiniteReturn { index: 1, .. })
        ));
        assert!(matches!(
            opt.update(&[1e308, -1e308], &[vec![], vec![]], &mut sink),
            Err(RepsError::NumericOverflow { index: 1, .. })
        ));

        let strict = DualOptimizer::from_config(&RepsConfig {
            solver: SolverConfig {
                max_iter: 2,
                ..SolverConfig::default()
            },
            ..RepsConfig::new(0.1)
        })
        .unwrap();
        assert!(matches!(
            strict.update(&[0.0, 50.0, 100.0], &[vec![], vec![], vec![]], &mut sink),
            Err(RepsError::SolverNonConvergence { .. })
        ));

        assert!(sink.calls.is_empty());
    }

    #[test]
    fn test_best_effort_reaches_sink() {
        let opt = DualOptimizer::from_config(&RepsConfig {
            solver: SolverConfig {
                max_iter: 2,
                ..SolverConfig::default()
            },
            on_nonconvergence: ConvergencePolicy::BestEffort,
            ..RepsConfig::new(0.1)
        })
        .unwrap();
        let mut sink = RecordingSink::default();

        let sol = opt
            .update(&[0.0, 50.0, 100.0], &[vec![], vec![], vec![]], &mut sink)
            .unwrap();
        assert!(!sol.solver.converged);
        assert_eq!(sink.calls.len(), 1);
    }

    #[test]
    fn test_optimizer_shared_across_threads() {
        let opt = DualOptimizer::new(0.5).unwrap();
        let batches: Vec<Vec<f64>> = (0..4)
            .map(|k| (0..10).map(|i| ((i * (k + 3)) % 7) as f64).collect())
            .collect();

        let expected: Vec<f64> = batches
            .iter()
            .map(|b| opt.solve(b).unwrap().eta)
            .collect();

        let parallel: Vec<f64> = std::thread::scope(|s| {
            let handles: Vec<_> = batches
                .iter()
                .map(|b| {
                    let opt = &opt;
                    s.spawn(move || opt.solve(b).unwrap().eta)
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(expected, parallel);
    }

    // =========================================================================
    // Episodic agent
    // =========================================================================

    #[test]
    fn test_fixed_gaussian_agent_tracks_target() {
        let target = vec![2.0, -1.0, 0.5];
        let dist = GaussianDistribution::new(vec![0.0; 3], vec![0.3; 3]).unwrap();
        let mut agent = Reps::new(dist, &RepsConfig::new(0.5)).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(20);

        for _ in 0..60 {
            let episodes: Vec<Episode> = (0..30)
                .map(|_| {
                    let theta = agent.episode_start(&mut rng);
                    let reward = sphere(&theta, &target);
                    Episode::with_rewards(theta, vec![reward])
                })
                .collect();
            agent.fit(&episodes).unwrap();
        }

        let mean = agent.distribution().mean();
        for (m, t) in mean.iter().zip(&target) {
            assert!((m - t).abs() < 0.3, "mean {mean:?} vs target {target:?}");
        }
    }

    #[test]
    fn test_agent_uses_discounted_returns() {
        let cfg = RepsConfig {
            gamma: 0.5,
            ..RepsConfig::new(1.0)
        };
        let dist = GaussianDistribution::new(vec![0.0], vec![1.0]).unwrap();
        let mut agent = Reps::new(dist, &cfg).unwrap();

        // Undiscounted the second episode is better; discounted the first is.
        let episodes = vec![
            Episode::with_rewards(vec![-1.0], vec![2.0, 0.0, 0.0]),
            Episode::with_rewards(vec![1.0], vec![0.0, 0.0, 3.0]),
        ];
        let report = agent.fit(&episodes).unwrap();

        assert_eq!(report.n_episodes, 2);
        assert!((report.max_return - 2.0).abs() < 1e-12);
        assert!((report.mean_return - 1.375).abs() < 1e-12);
        assert!(agent.distribution().mean()[0] < 0.0);
    }

    #[test]
    fn test_diagonal_agent_shrinks_spread() {
        let target = vec![0.5, 0.5];
        let dist = GaussianDiagonalDistribution::new(vec![0.0; 2], vec![1.0; 2]).unwrap();
        let entropy_before = dist.entropy();
        let mut agent = Reps::new(dist, &RepsConfig::conservative()).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(3);

        for _ in 0..20 {
            let episodes: Vec<Episode> = (0..40)
                .map(|_| {
                    let theta = agent.episode_start(&mut rng);
                    let reward = sphere(&theta, &target);
                    Episode::with_rewards(theta, vec![reward])
                })
                .collect();
            let report = agent.fit(&episodes).unwrap();
            assert!(report.empirical_kl <= 0.1 + 1e-6);
        }

        assert!(agent.distribution().entropy() < entropy_before);
    }
}
