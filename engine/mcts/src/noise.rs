//! Exploration noise for the root's children.

use rand::Rng;

use crate::arena::NodeArena;
use crate::config::RootNoise;
use crate::node::NodeId;
use crate::random::{sample_dirichlet, sample_gumbel};

/// Perturb the priors of `parent`'s children.
///
/// Dirichlet noise mixes into `policy`; Gumbel noise is added to
/// `policy_logit`. Either way the sample is kept in `policy_noise`. A node
/// without children is left unchanged.
pub fn apply_root_noise<R: Rng + ?Sized>(
    arena: &mut NodeArena,
    parent: NodeId,
    noise: RootNoise,
    rng: &mut R,
) {
    let children = arena.get(parent).children();
    let num_children = children.clone().count();
    if num_children == 0 {
        return;
    }

    match noise {
        RootNoise::None => {}
        RootNoise::Dirichlet { alpha, epsilon } => {
            let samples = sample_dirichlet(rng, alpha, num_children);
            for (id, d) in children.zip(samples) {
                let child = arena.get_mut(id);
                child.policy = (1.0 - epsilon) * child.policy + epsilon * d;
                child.policy_noise = d;
            }
        }
        RootNoise::Gumbel => {
            let samples = sample_gumbel(rng, num_children);
            for (id, g) in children.zip(samples) {
                let child = arena.get_mut(id);
                child.policy_logit += g;
                child.policy_noise = g;
            }
        }
    }
}
