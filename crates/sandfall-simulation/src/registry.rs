//! Compiled material registry
//!
//! Compilation resolves every material name once and produces the dense
//! lookup tables the simulation reads on its hot path.

use std::collections::HashMap;

use crate::rules::{InteractionSpec, RuleSet};
use crate::{Conversion, InteractionTable, MaterialDef, MaterialId, Materials, RegistryError};

/// Immutable, shared view of all material data used by a running world
pub struct MaterialRegistry {
    materials: Materials,
    interactions: InteractionTable,
}

fn check_probability(probability: f32, context: impl FnOnce() -> String) -> Result<(), RegistryError> {
    if (0.0..=1.0).contains(&probability) {
        Ok(())
    } else {
        Err(RegistryError::InvalidProbability {
            probability,
            context: context(),
        })
    }
}

impl MaterialRegistry {
    /// Compile the rule data shipped with the crate
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::compile(&RuleSet::builtin()?)
    }

    pub fn compile(rules: &RuleSet) -> Result<Self, RegistryError> {
        if rules.materials.len() >= MaterialId::BOUNDARY as usize {
            return Err(RegistryError::TooManyMaterials(rules.materials.len()));
        }

        let mut ids: HashMap<&str, u16> = HashMap::new();
        for (index, spec) in rules.materials.iter().enumerate() {
            if spec.name.is_empty() || spec.name == "air" {
                return Err(RegistryError::ReservedName(spec.name.clone()));
            }
            if spec.density.is_nan() || spec.density <= 0.0 {
                return Err(RegistryError::InvalidDensity {
                    name: spec.name.clone(),
                    density: spec.density,
                });
            }
            if ids.insert(&spec.name, index as u16 + 1).is_some() {
                return Err(RegistryError::DuplicateMaterial(spec.name.clone()));
            }
        }

        let resolve = |name: &str, context: &dyn Fn() -> String| -> Result<u16, RegistryError> {
            if name.is_empty() || name == "air" {
                return Ok(MaterialId::AIR);
            }
            ids.get(name)
                .copied()
                .ok_or_else(|| RegistryError::UnknownMaterial {
                    name: name.to_string(),
                    context: context(),
                })
        };

        let mut declared = Vec::with_capacity(rules.materials.len());
        for (index, spec) in rules.materials.iter().enumerate() {
            let mut conversions = Vec::with_capacity(spec.convert.len());
            for conversion in &spec.convert {
                let context = || format!("conversion of '{}'", spec.name);
                check_probability(conversion.prob, context)?;
                conversions.push(Conversion {
                    probability: conversion.prob,
                    into: resolve(&conversion.into, &context)?,
                });
            }

            declared.push(MaterialDef {
                id: index as u16 + 1,
                name: spec.name.clone(),
                density: spec.density,
                is_static: spec.is_static,
                falling: spec.falling,
                dynamic: spec.dynamic,
                liquid: spec.liquid,
                gas: spec.gas,
                sand: spec.sand,
                color: spec.color,
                conversions,
            });
        }
        let mut materials = Materials::from_declared(declared);

        // Charge carriers decay on their own: rising charge settles into the
        // charged state, falling charge back into the plain material.
        if let Some(conductive) = &rules.generators.conductive {
            for name in &conductive.materials {
                let context = || format!("conductive material '{name}'");
                let plain = resolve(name, &context)?;
                let rise = resolve(&format!("{name}-rise"), &context)?;
                let fall = resolve(&format!("{name}-fall"), &context)?;
                let charged = resolve(&format!("{name}-charged"), &context)?;
                materials.set_conversions(
                    rise,
                    vec![Conversion {
                        probability: 1.0,
                        into: charged,
                    }],
                );
                materials.set_conversions(
                    fall,
                    vec![Conversion {
                        probability: 1.0,
                        into: plain,
                    }],
                );
            }
        }

        let mut interactions = InteractionTable::new(materials.len());
        let generated = rules.generated_interactions();
        let generated_count = generated.len();
        let ordered = generated.iter().chain(rules.interactions.iter());
        for rule in ordered {
            Self::install(&mut interactions, rule, &resolve)?;
        }

        log::info!(
            "Compiled {} materials, {} generated and {} explicit interactions ({} table entries)",
            rules.materials.len(),
            generated_count,
            rules.interactions.len(),
            interactions.rule_count()
        );

        Ok(Self {
            materials,
            interactions,
        })
    }

    fn install(
        table: &mut InteractionTable,
        rule: &InteractionSpec,
        resolve: &dyn Fn(&str, &dyn Fn() -> String) -> Result<u16, RegistryError>,
    ) -> Result<(), RegistryError> {
        let context = || format!("interaction '{}' + '{}'", rule.a, rule.b);
        check_probability(rule.prob, context)?;
        let a = resolve(&rule.a, &context)?;
        let b = resolve(&rule.b, &context)?;
        let a1 = resolve(&rule.a1, &context)?;
        let b1 = resolve(&rule.b1, &context)?;
        table.insert(a, b, a1, b1, rule.prob);
        Ok(())
    }

    pub fn materials(&self) -> &Materials {
        &self.materials
    }

    pub fn interactions(&self) -> &InteractionTable {
        &self.interactions
    }

    /// Shorthand for `materials().get(id)`
    pub fn get(&self, id: u16) -> &MaterialDef {
        self.materials.get(id)
    }

    /// Shorthand for `materials().id_of(name)`
    pub fn id_of(&self, name: &str) -> Option<u16> {
        self.materials.id_of(name)
    }
}
