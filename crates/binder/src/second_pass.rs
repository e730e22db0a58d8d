// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Second Passes
//!
//! Work the first pass cannot finish because it needs bindings that may not
//! exist yet, such as the key columns of an entity bound later. Each unit is
//! a plain data variant; [`drain`] runs them once every class has had its
//! first pass.
//!
//! ## Ordering
//!
//! Units run phase by phase, in insertion order within a phase:
//!
//! ```text
//! IdGenerator → ImplicitJoinTable → ForeignKey → SecondaryTableFromAnnotation
//!   → CreateKey → SecondaryTable → Association → Discriminator → Verification
//! ```
//!
//! Producers enqueue a unit only after the units it depends on, and a later
//! phase may rely on every earlier phase having run. Units enqueued while
//! draining are picked up by another round.
//!
//! ## Deferral
//!
//! A handler returns [`Resolution::Deferred`] when a dependency is still
//! missing. Handlers finish every lookup before they mutate anything, so a
//! deferred unit can be run again. With retries enabled a deferred unit is
//! retried while the drain makes progress; a round without progress turns
//! the first deferral into [`MappingError::Unresolved`]. Without retries the
//! first deferral is fatal.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, info, warn};

use crate::association::{self, PendingCollection, PendingJoinTable};
use crate::discriminator;
use crate::error::{BindResult, Deferral, Resolution};
use crate::foreign_key::{self, PendingForeignKey};
use crate::identifier;
use crate::registrations;
use crate::session::BootSession;
use crate::table;

/// Execution phase of a second pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SecondPassPhase {
    IdGenerator,
    ImplicitJoinTable,
    ForeignKey,
    SecondaryTableFromAnnotation,
    CreateKey,
    SecondaryTable,
    Association,
    Discriminator,
    Verification,
}

impl SecondPassPhase {
    pub const ALL: [SecondPassPhase; 9] = [
        SecondPassPhase::IdGenerator,
        SecondPassPhase::ImplicitJoinTable,
        SecondPassPhase::ForeignKey,
        SecondPassPhase::SecondaryTableFromAnnotation,
        SecondPassPhase::CreateKey,
        SecondPassPhase::SecondaryTable,
        SecondPassPhase::Association,
        SecondPassPhase::Discriminator,
        SecondPassPhase::Verification,
    ];
}

/// A deferred unit of binding work
#[derive(Debug, Clone, PartialEq)]
pub enum SecondPass {
    /// Resolve a named generator declared on a class bound later
    IdGenerator {
        entity: String,
        property: String,
        generator: String,
    },
    /// Create a to-one join table whose name depends on the target table
    ImplicitJoinTable(PendingJoinTable),
    ForeignKey(PendingForeignKey),
    /// Apply `@SecondaryRow` and `@TableOptions` to secondary tables
    SecondaryTableFromAnnotation { entity: String },
    /// Create the primary key of an entity's own table
    CreateKey { entity: String },
    /// Bind the key columns of secondary tables
    SecondaryTable { entity: String },
    /// Bind key and element columns of a collection
    Association(PendingCollection),
    /// Check the owning side of a `@OneToOne(mappedBy)`
    InverseOneToOne {
        entity: String,
        property: String,
        target: String,
        mapped_by: String,
    },
    /// Make the discriminator column nullable when a subclass uses `null`
    NullableDiscriminator { root: String },
    /// Check the associations named by a fetch profile
    FetchProfile { name: String },
}

impl SecondPass {
    pub fn phase(&self) -> SecondPassPhase {
        match self {
            SecondPass::IdGenerator { .. } => SecondPassPhase::IdGenerator,
            SecondPass::ImplicitJoinTable(_) => SecondPassPhase::ImplicitJoinTable,
            SecondPass::ForeignKey(_) => SecondPassPhase::ForeignKey,
            SecondPass::SecondaryTableFromAnnotation { .. } => {
                SecondPassPhase::SecondaryTableFromAnnotation
            }
            SecondPass::CreateKey { .. } => SecondPassPhase::CreateKey,
            SecondPass::SecondaryTable { .. } => SecondPassPhase::SecondaryTable,
            SecondPass::Association(_) | SecondPass::InverseOneToOne { .. } => {
                SecondPassPhase::Association
            }
            SecondPass::NullableDiscriminator { .. } => SecondPassPhase::Discriminator,
            SecondPass::FetchProfile { .. } => SecondPassPhase::Verification,
        }
    }

    /// Short description for logs
    pub fn describe(&self) -> String {
        match self {
            SecondPass::IdGenerator {
                entity, generator, ..
            } => format!("generator '{}' of {}", generator, entity),
            SecondPass::ImplicitJoinTable(pending) => {
                format!("join table of {}.{}", pending.entity, pending.property)
            }
            SecondPass::ForeignKey(pending) => pending.describe(),
            SecondPass::SecondaryTableFromAnnotation { entity } => {
                format!("secondary table options of {}", entity)
            }
            SecondPass::CreateKey { entity } => format!("primary key of {}", entity),
            SecondPass::SecondaryTable { entity } => format!("secondary table keys of {}", entity),
            SecondPass::Association(pending) => format!("collection {}", pending.role),
            SecondPass::InverseOneToOne {
                entity, property, ..
            } => format!("inverse one-to-one {}.{}", entity, property),
            SecondPass::NullableDiscriminator { root } => format!("discriminator of {}", root),
            SecondPass::FetchProfile { name } => format!("fetch profile '{}'", name),
        }
    }
}

/// Second passes grouped by phase, in insertion order
#[derive(Debug, Default)]
pub struct SecondPassQueue {
    passes: BTreeMap<SecondPassPhase, VecDeque<SecondPass>>,
}

impl SecondPassQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pass: SecondPass) {
        self.passes.entry(pass.phase()).or_default().push_back(pass);
    }

    /// Take the oldest pass of a phase
    pub fn pop(&mut self, phase: SecondPassPhase) -> Option<SecondPass> {
        self.passes.get_mut(&phase).and_then(VecDeque::pop_front)
    }

    pub fn len(&self) -> usize {
        self.passes.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.values().all(VecDeque::is_empty)
    }

    /// Passes in execution order
    pub fn iter(&self) -> impl Iterator<Item = &SecondPass> {
        self.passes.values().flatten()
    }
}

/// Run every queued second pass
///
/// # Errors
///
/// The first fatal error of a handler, or [`MappingError::Unresolved`] for a
/// deferral that cannot make progress.
///
/// [`MappingError::Unresolved`]: crate::error::MappingError::Unresolved
pub fn drain(session: &mut BootSession<'_>) -> BindResult<()> {
    let retry = session.context.config.retry_deferred_second_passes;
    let mut executed = 0usize;
    let mut round = 0usize;

    loop {
        round += 1;
        let mut progress = false;
        let mut carried: Vec<(SecondPass, Deferral)> = Vec::new();

        for phase in SecondPassPhase::ALL {
            let mut pending: Vec<(SecondPass, Deferral)> = Vec::new();
            loop {
                let mut advanced = false;
                while let Some(pass) = session.collector.second_passes_mut().pop(phase) {
                    match run(session, &pass) {
                        Resolution::Resolved(()) => {
                            debug!(?phase, pass = %pass.describe(), "Second pass done");
                            executed += 1;
                            advanced = true;
                            progress = true;
                        }
                        Resolution::Deferred(deferral) => {
                            if !retry {
                                return Err(deferral.into_error());
                            }
                            debug!(
                                ?phase,
                                pass = %pass.describe(),
                                waiting_for = %deferral.dependency,
                                "Second pass deferred"
                            );
                            pending.push((pass, deferral));
                        }
                        Resolution::Fatal(error) => return Err(error),
                    }
                }
                if !advanced || pending.is_empty() {
                    break;
                }
                for (pass, _) in pending.drain(..) {
                    session.collector.second_passes_mut().push(pass);
                }
            }
            carried.extend(pending);
        }

        let queue_empty = session.collector.second_passes().is_empty();
        if carried.is_empty() && queue_empty {
            info!(executed, rounds = round, "Second passes complete");
            return Ok(());
        }
        if !progress && queue_empty {
            let (pass, deferral) = carried.remove(0);
            warn!(pass = %pass.describe(), remaining = carried.len() + 1, "Second passes made no progress");
            return Err(deferral.into_error());
        }
        for (pass, _) in carried {
            session.collector.second_passes_mut().push(pass);
        }
    }
}

fn run(session: &mut BootSession<'_>, pass: &SecondPass) -> Resolution<()> {
    match pass {
        SecondPass::IdGenerator {
            entity,
            property,
            generator,
        } => identifier::resolve_id_generator(session, entity, property, generator),
        SecondPass::ImplicitJoinTable(pending) => association::bind_implicit_join_table(session, pending),
        SecondPass::ForeignKey(pending) => foreign_key::bind_foreign_key(session, pending),
        SecondPass::SecondaryTableFromAnnotation { entity } => {
            table::apply_secondary_table_options(session, entity)
        }
        SecondPass::CreateKey { entity } => table::create_primary_key(session, entity),
        SecondPass::SecondaryTable { entity } => table::bind_secondary_table_keys(session, entity),
        SecondPass::Association(pending) => association::bind_collection(session, pending),
        SecondPass::InverseOneToOne {
            entity,
            property,
            target,
            mapped_by,
        } => association::verify_inverse_one_to_one(session, entity, property, target, mapped_by),
        SecondPass::NullableDiscriminator { root } => {
            discriminator::apply_null_discriminator_value(session, root)
        }
        SecondPass::FetchProfile { name } => registrations::verify_fetch_profile(session, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_pops_in_phase_then_insertion_order() {
        let mut queue = SecondPassQueue::new();
        queue.push(SecondPass::CreateKey {
            entity: "B".to_string(),
        });
        queue.push(SecondPass::FetchProfile {
            name: "eager".to_string(),
        });
        queue.push(SecondPass::CreateKey {
            entity: "A".to_string(),
        });
        queue.push(SecondPass::IdGenerator {
            entity: "C".to_string(),
            property: "id".to_string(),
            generator: "seq".to_string(),
        });
        assert_eq!(queue.len(), 4);

        let phases: Vec<SecondPassPhase> = queue.iter().map(SecondPass::phase).collect();
        assert_eq!(
            phases,
            vec![
                SecondPassPhase::IdGenerator,
                SecondPassPhase::CreateKey,
                SecondPassPhase::CreateKey,
                SecondPassPhase::Verification,
            ]
        );
        assert_eq!(
            queue.pop(SecondPassPhase::CreateKey),
            Some(SecondPass::CreateKey {
                entity: "B".to_string()
            })
        );
        assert!(queue.pop(SecondPassPhase::ForeignKey).is_none());
        assert!(!queue.is_empty());
    }

    #[test]
    fn test_phase_order_is_total() {
        let mut sorted = SecondPassPhase::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, SecondPassPhase::ALL.to_vec());
        assert_eq!(
            SecondPass::InverseOneToOne {
                entity: "Person".to_string(),
                property: "passport".to_string(),
                target: "Passport".to_string(),
                mapped_by: "owner".to_string(),
            }
            .phase(),
            SecondPassPhase::Association
        );
    }

    #[test]
    fn test_describe_names_the_entity() {
        let pass = SecondPass::SecondaryTable {
            entity: "com.acme.Order".to_string(),
        };
        assert!(pass.describe().contains("com.acme.Order"));
    }
}
