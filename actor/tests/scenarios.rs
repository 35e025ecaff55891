//! End-to-end searches on small games with mock networks.

mod common;

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;

use actor::{Actor, ActorGroup, GroupOptions, RunLimits};
use common::{CenterPeakedNetwork, RecordingNetwork, WinOracleNetwork};
use engine_core::{Environment, Player, Rotation};
use games_gomoku::Gomoku;
use games_tictactoe::TicTacToe;
use mcts::{
    random, ActionSelection, BatchEvaluator, MctsConfig, MctsTree, NetworkOutput, NodeId,
    RootNoise, UniformNetwork, ValueMap,
};

fn root_priors(tree: &MctsTree) -> HashMap<usize, f32> {
    tree.root()
        .children()
        .map(|id| {
            let child = tree.get(id);
            (child.action_id().unwrap(), child.policy)
        })
        .collect()
}

fn assert_value_map_matches_visited(tree: &MctsTree) {
    let mut expected = ValueMap::new();
    for (_, node) in tree.arena().iter() {
        if node.count > 0 {
            expected.insert(node.mean);
        }
    }
    assert_eq!(tree.value_map(), &expected);
}

#[test]
fn uniform_search_visits_every_opening_move() {
    let evaluator = BatchEvaluator::new(UniformNetwork::new(9).with_value(0.0));
    let config = MctsConfig::for_testing().with_simulations(9);
    let mut actor = Actor::new(TicTacToe::new(), config);

    actor.think(&evaluator, false).unwrap();

    let tree = actor.tree();
    assert_eq!(tree.root().count, 10);
    assert_eq!(tree.root().num_children, 9);
    let counts: Vec<u32> = tree.root().children().map(|id| tree.get(id).count).collect();
    assert!(counts.iter().all(|&c| c >= 1), "counts: {counts:?}");
    assert_eq!(counts.iter().sum::<u32>(), 9);
    // Not played
    assert!(actor.environment().action_history().is_empty());
}

#[test]
fn search_takes_the_immediate_win() {
    // X on 0 and 1, O on 3 and 4, X to move: 2 wins on the spot.
    let env = TicTacToe::from_moves(&[0, 3, 1, 4]).unwrap();
    assert_eq!(
        WinOracleNetwork::value(&env.features(Rotation::Identity)),
        1.0
    );
    let evaluator = BatchEvaluator::new(WinOracleNetwork);
    let config = MctsConfig::for_testing().with_simulations(50);
    let mut actor = Actor::new(env, config);

    let action = actor.think(&evaluator, true).unwrap();

    assert_eq!(action.id(), 2);
    assert_eq!(action.player(), Player::P1);
    assert!(actor.environment().is_terminal());
    assert_eq!(actor.environment().eval_score(false), 1.0);
    assert_eq!(actor.comments().len(), 1);
}

#[test]
fn center_peaked_priors_survive_dirichlet_noise() {
    let evaluator = BatchEvaluator::new(CenterPeakedNetwork);
    let config = MctsConfig::for_testing()
        .with_simulations(100)
        .with_root_noise(RootNoise::Dirichlet {
            alpha: 0.3,
            epsilon: 0.25,
        });

    let mut central = 0;
    for seed in 0..20 {
        random::seed(seed);
        let mut actor = Actor::new(Gomoku::new(), config.clone());
        let action = actor.think(&evaluator, false).unwrap();
        if Gomoku::distance_from_center(action.id()) <= 1 {
            central += 1;
        }
    }
    assert!(central >= 19, "only {central} of 20 searches chose a central move");
}

#[test]
fn every_forward_carries_one_leaf_per_actor() {
    let config = MctsConfig::for_testing()
        .with_simulations(20)
        .with_action_selection(ActionSelection::BySoftmaxCount { temperature: 1.0 });
    let actors = (0..2)
        .map(|_| Actor::new(TicTacToe::new(), config.clone()))
        .collect();
    let options = GroupOptions {
        num_threads: 2,
        ..GroupOptions::default()
    };
    let group = ActorGroup::new(actors, vec![RecordingNetwork::new(9)], Vec::new(), options)
        .unwrap();

    let limits = RunLimits {
        max_steps: Some(45),
        max_games: None,
    };
    let summary = group.run(&AtomicBool::new(false), limits).unwrap();

    assert_eq!(summary.steps, 45);
    // 21 backups per move: moves land on steps 22 and 43
    assert_eq!(summary.moves_played, 4);
    let sizes = group.evaluator(0).unwrap().network().batch_sizes();
    assert_eq!(sizes.len(), 45);
    assert!(sizes.iter().all(|&size| size == 2), "batch sizes: {sizes:?}");
    for index in 0..2 {
        let moves = group
            .with_actor(index, |actor| actor.environment().action_history().len())
            .unwrap();
        assert_eq!(moves, 2);
    }
}

#[test]
fn win_oracle_scores_threats_for_the_side_to_move() {
    let threat = TicTacToe::from_moves(&[0, 3, 1, 4, 8]).unwrap();
    assert_eq!(WinOracleNetwork::value(&threat.features(Rotation::Identity)), -1.0);
    let won = TicTacToe::from_moves(&[0, 3, 1, 4, 2]).unwrap();
    assert_eq!(WinOracleNetwork::value(&won.features(Rotation::Identity)), 1.0);
    let quiet = TicTacToe::from_moves(&[4]).unwrap();
    assert_eq!(WinOracleNetwork::value(&quiet.features(Rotation::Identity)), 0.0);
}

#[test]
fn actors_share_evaluators_round_robin() {
    let config = MctsConfig::for_testing().with_simulations(20);
    let actors = (0..3)
        .map(|_| Actor::new(TicTacToe::new(), config.clone()))
        .collect();
    let networks = vec![RecordingNetwork::new(9), RecordingNetwork::new(9)];
    let options = GroupOptions {
        num_threads: 3,
        ..GroupOptions::default()
    };
    let group = ActorGroup::new(actors, networks, Vec::new(), options).unwrap();
    assert_eq!(group.num_workers(), 3);

    let limits = RunLimits {
        max_steps: Some(40),
        max_games: None,
    };
    let summary = group.run(&AtomicBool::new(false), limits).unwrap();
    assert_eq!(summary.steps, 40);

    // Actors 0 and 2 use evaluator 0, actor 1 uses evaluator 1
    let first = group.evaluator(0).unwrap().network().batch_sizes();
    let second = group.evaluator(1).unwrap().network().batch_sizes();
    assert_eq!(first, vec![2; 40]);
    assert_eq!(second, vec![1; 40]);
    for index in 0..3 {
        let moves = group
            .with_actor(index, |actor| actor.environment().action_history().len())
            .unwrap();
        assert_eq!(moves, 1, "actor {index}");
    }
}

#[test]
fn same_seed_reproduces_the_search() {
    let evaluator = BatchEvaluator::new(UniformNetwork::new(9).with_value(0.2));
    let env = TicTacToe::from_moves(&[4]).unwrap();
    let mut actor = Actor::new(env, MctsConfig::for_testing().with_simulations(40));

    random::seed(9);
    let first_action = actor.think(&evaluator, false).unwrap();
    let first = actor.tree().search_distribution();
    random::seed(9);
    let second_action = actor.think(&evaluator, false).unwrap();
    let second = actor.tree().search_distribution();

    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_eq!(first_action, second_action);
}

#[test]
fn same_seed_reproduces_noisy_root_priors() {
    let noise = RootNoise::Dirichlet {
        alpha: 0.3,
        epsilon: 0.25,
    };
    let first = priors_after_root_expansion(noise, 21);
    let second = priors_after_root_expansion(noise, 21);
    assert_eq!(first, second);
}

#[test]
fn proof_cost_terminal_root_backs_up_top_bin() {
    // X wins on the diagonal; the root itself is terminal.
    let env = TicTacToe::from_moves(&[0, 1, 4, 2, 8]).unwrap();
    assert!(env.is_terminal());
    let evaluator = BatchEvaluator::new(UniformNetwork::new(9));
    let config = MctsConfig::for_testing()
        .with_simulations(1)
        .with_proof_cost(200);
    let mut actor = Actor::new(env, config);

    actor.before_nn_evaluation(&evaluator).unwrap();
    let outputs = evaluator.forward().unwrap();
    actor.after_nn_evaluation(&outputs[0]).unwrap();

    let tree = actor.tree();
    assert_eq!(tree.root().count, 1);
    assert_eq!(tree.root().value, 199.0);
    assert_eq!(tree.root().mean, 199.0);
    assert!(tree.root().is_leaf());
    assert_eq!(tree.value_map().len(), 1);
    assert_eq!(tree.value_map().count(199.0), 1);
}

fn priors_after_root_expansion(noise: RootNoise, seed: u64) -> HashMap<usize, f32> {
    random::seed(seed);
    let evaluator = BatchEvaluator::new(UniformNetwork::new(9));
    let config = MctsConfig::for_testing().with_root_noise(noise);
    let mut actor = Actor::new(TicTacToe::new(), config);
    actor.before_nn_evaluation(&evaluator).unwrap();
    let outputs = evaluator.forward().unwrap();
    actor.after_nn_evaluation(&outputs[0]).unwrap();
    root_priors(actor.tree())
}

#[test]
fn dirichlet_noise_changes_root_priors() {
    let plain = priors_after_root_expansion(RootNoise::None, 7);
    let noisy = priors_after_root_expansion(
        RootNoise::Dirichlet {
            alpha: 0.3,
            epsilon: 0.25,
        },
        7,
    );

    assert_eq!(plain.len(), 9);
    assert_eq!(noisy.len(), 9);
    for priors in [&plain, &noisy] {
        let sum: f32 = priors.values().sum();
        assert!((sum - 1.0).abs() < 1e-4, "priors sum to {sum}");
    }
    assert!(plain.values().all(|&p| (p - 1.0 / 9.0).abs() < 1e-6));
    assert!(plain.iter().any(|(id, p)| (noisy[id] - p).abs() > 1e-4));
}

#[test]
fn gumbel_noise_perturbs_logits_only() {
    random::seed(11);
    let evaluator = BatchEvaluator::new(UniformNetwork::new(9));
    let config = MctsConfig::for_testing().with_root_noise(RootNoise::Gumbel);
    let mut actor = Actor::new(TicTacToe::new(), config);
    actor.before_nn_evaluation(&evaluator).unwrap();
    let outputs = evaluator.forward().unwrap();
    actor.after_nn_evaluation(&outputs[0]).unwrap();

    let tree = actor.tree();
    let children: Vec<_> = tree.root().children().map(|id| tree.get(id)).collect();
    assert!(children.iter().all(|c| (c.policy - 1.0 / 9.0).abs() < 1e-6));
    assert!(children.iter().all(|c| c.policy_logit == c.policy_noise));
    assert!(children.iter().any(|c| c.policy_noise != 0.0));
}

#[test]
fn tree_statistics_stay_consistent_over_a_game() {
    random::seed(3);
    let evaluator = BatchEvaluator::new(UniformNetwork::new(9).with_value(0.1));
    let config = MctsConfig::for_testing()
        .with_simulations(30)
        .with_action_selection(ActionSelection::BySoftmaxCount { temperature: 1.0 });
    let mut actor = Actor::new(TicTacToe::new(), config);

    while !actor.environment().is_terminal() {
        actor.think(&evaluator, true).unwrap();

        let tree = actor.tree();
        assert_eq!(tree.root().count, 31);
        assert_value_map_matches_visited(tree);

        let arena = tree.arena();
        assert!(arena.len() <= arena.capacity());
        let allocated: usize = arena.iter().map(|(_, n)| n.num_children as usize).sum();
        assert_eq!(arena.len(), 1 + allocated);

        // An expanded node was a leaf exactly once, then every further
        // backup went through one of its children.
        for (id, node) in arena.iter() {
            if node.is_leaf() {
                continue;
            }
            let children: Vec<_> = node.children().map(|c| tree.get(c)).collect();
            let child_count: u32 = children.iter().map(|c| c.count).sum();
            assert_eq!(node.count, 1 + child_count, "node {id:?}");
            let child_total: f32 = children.iter().map(|c| c.mean * c.count as f32).sum();
            let total = node.mean * node.count as f32;
            assert!(
                (total - (node.value + child_total)).abs() < 1e-3,
                "node {id:?}: {total} vs {}",
                node.value + child_total
            );
        }
    }
    assert_eq!(actor.comments().len(), actor.environment().action_history().len());
}

#[test]
fn think_on_a_finished_game_reports_no_action() {
    let env = TicTacToe::from_moves(&[0, 1, 4, 2, 8]).unwrap();
    let evaluator = BatchEvaluator::new(UniformNetwork::new(9));
    let mut actor = Actor::new(env, MctsConfig::for_testing().with_simulations(4));

    assert!(actor.think(&evaluator, true).is_err());
    assert_eq!(actor.tree().root().count, 5);
    assert_eq!(actor.tree().get(NodeId::ROOT).num_children, 0);
}

#[test]
fn proof_cost_outputs_drive_leaf_evaluations() {
    let evaluator = BatchEvaluator::new(UniformNetwork::new(9));
    let config = MctsConfig::for_testing()
        .with_simulations(1)
        .with_proof_cost(4);
    let mut actor = Actor::new(TicTacToe::new(), config);

    actor.before_nn_evaluation(&evaluator).unwrap();
    evaluator.forward().unwrap();
    let output =
        NetworkOutput::from_proof_cost_logits(vec![0.0; 9], &[0.0, 0.0, 0.0, 9.0], &[9.0, 0.0, 0.0, 0.0]);
    actor.after_nn_evaluation(&output).unwrap();

    let evaluation = actor.tree().leaf_evaluation(NodeId::ROOT).unwrap();
    assert!(evaluation.value_n > 2.9);
    assert!(evaluation.value_m < 0.1);
}

#[test]
fn root_noise_is_mixed_in_once_per_search() {
    random::seed(5);
    let evaluator = BatchEvaluator::new(UniformNetwork::new(9));
    let epsilon = 0.25;
    let config = MctsConfig::for_testing()
        .with_simulations(40)
        .with_root_noise(RootNoise::Dirichlet {
            alpha: 0.3,
            epsilon,
        });
    let mut actor = Actor::new(TicTacToe::new(), config);

    actor.think(&evaluator, false).unwrap();

    let tree = actor.tree();
    let noise_sum: f32 = tree.root().children().map(|id| tree.get(id).policy_noise).sum();
    assert!((noise_sum - 1.0).abs() < 1e-4);
    for id in tree.root().children() {
        let child = tree.get(id);
        let expected = (1.0 - epsilon) / 9.0 + epsilon * child.policy_noise;
        assert!((child.policy - expected).abs() < 1e-6, "child {id:?}");
    }
    // Below the root the priors are untouched
    let root_children = tree.root().child_range();
    for (id, node) in tree.arena().iter() {
        if id != NodeId::ROOT && !root_children.contains(&id.0) {
            assert_eq!(node.policy_noise, 0.0, "node {id:?}");
        }
    }
}
