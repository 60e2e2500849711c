//! Declarative material rule data
//!
//! Rules reference materials by name. Names are resolved to ids only when a
//! [`RuleSet`] is compiled into a [`crate::MaterialRegistry`].

use serde::{Deserialize, Serialize};

use crate::RegistryError;

const BUILTIN_RULES: &str = include_str!("../assets/materials.ron");

fn default_color() -> [u8; 4] {
    [255, 0, 255, 255]
}

/// A material as it appears in rule data
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaterialSpec {
    pub name: String,
    pub density: f32,
    #[serde(rename = "static", default)]
    pub is_static: bool,
    #[serde(default)]
    pub falling: bool,
    #[serde(default)]
    pub dynamic: bool,
    #[serde(default)]
    pub liquid: bool,
    #[serde(default)]
    pub gas: bool,
    #[serde(default)]
    pub sand: bool,
    #[serde(default = "default_color")]
    pub color: [u8; 4],
    #[serde(default)]
    pub convert: Vec<ConversionSpec>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversionSpec {
    pub prob: f32,
    pub into: String,
}

/// Explicit pairwise rule: when `a` touches `b`, `a` becomes `a1` and `b` becomes `b1`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionSpec {
    pub a: String,
    pub b: String,
    pub a1: String,
    pub b1: String,
    pub prob: f32,
}

impl InteractionSpec {
    pub fn new(a: &str, b: &str, a1: &str, b1: &str, prob: f32) -> Self {
        Self {
            a: a.to_string(),
            b: b.to_string(),
            a1: a1.to_string(),
            b1: b1.to_string(),
            prob,
        }
    }
}

/// What a material turns into when exposed to a burner or melter
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transform {
    pub name: String,
    pub turn_to: String,
    pub prob: f32,
}

/// Dirty ground soaked by water turns to mud
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MudSpec {
    pub dirt: Vec<String>,
    pub water: String,
    pub mud: String,
    pub prob: f32,
}

/// Charge propagation through conductive materials.
///
/// Every listed material `m` must have `m-rise`, `m-fall` and `m-charged` variants.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConductiveSpec {
    pub materials: Vec<String>,
    pub acid: String,
    pub acid_spent: String,
    pub base: String,
    pub base_spent: String,
    /// Pairs (either order) that do not pass charge to each other
    #[serde(default)]
    pub excluded: Vec<(String, String)>,
}

/// Metals that dissolve in lava
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LavaSolubleSpec {
    pub lava: String,
    pub metals: Vec<String>,
    pub prob: f32,
}

/// Inputs for mechanically generated interaction rules
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GeneratorSpec {
    #[serde(default)]
    pub burners: Vec<String>,
    #[serde(default)]
    pub burnables: Vec<Transform>,
    #[serde(default)]
    pub mud: Option<MudSpec>,
    #[serde(default)]
    pub conductive: Option<ConductiveSpec>,
    #[serde(default)]
    pub melters: Vec<String>,
    #[serde(default)]
    pub meltables: Vec<Transform>,
    #[serde(default)]
    pub lava_soluble: Option<LavaSolubleSpec>,
}

/// Complete declarative rule data
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub materials: Vec<MaterialSpec>,
    #[serde(default)]
    pub interactions: Vec<InteractionSpec>,
    #[serde(default)]
    pub generators: GeneratorSpec,
}

impl RuleSet {
    pub fn from_ron(source: &str) -> Result<Self, RegistryError> {
        Ok(ron::from_str(source)?)
    }

    /// The rule data shipped with the crate
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_ron(BUILTIN_RULES)
    }

    /// Generated rules in compile order.
    ///
    /// Groups are produced burn/mud pairs first, then conduction, melting and
    /// lava solubility; each group is placed in front of the previous ones,
    /// so the last generated group is compiled first.
    pub fn generated_interactions(&self) -> Vec<InteractionSpec> {
        let mut groups: Vec<Vec<InteractionSpec>> = Vec::new();
        let generators = &self.generators;

        for (i, first) in self.materials.iter().enumerate() {
            for second in &self.materials[i + 1..] {
                let burning1 = generators.burners.contains(&first.name);
                let burning2 = generators.burners.contains(&second.name);
                let burnable1 = generators.burnables.iter().find(|t| t.name == first.name);
                let burnable2 = generators.burnables.iter().find(|t| t.name == second.name);

                if burning1 && let Some(burn) = burnable2 {
                    groups.push(vec![InteractionSpec::new(
                        &first.name,
                        &second.name,
                        &first.name,
                        &burn.turn_to,
                        burn.prob,
                    )]);
                }
                if burning2 && let Some(burn) = burnable1 {
                    groups.push(vec![InteractionSpec::new(
                        &second.name,
                        &first.name,
                        &second.name,
                        &burn.turn_to,
                        burn.prob,
                    )]);
                }
                if let Some(mud) = &generators.mud {
                    let soaks = (mud.dirt.contains(&first.name) && second.name == mud.water)
                        || (first.name == mud.water && mud.dirt.contains(&second.name));
                    if soaks {
                        groups.push(vec![InteractionSpec::new(
                            &first.name,
                            &second.name,
                            &mud.mud,
                            "air",
                            mud.prob,
                        )]);
                    }
                }
            }
        }

        if let Some(conductive) = &generators.conductive {
            for m1 in &conductive.materials {
                groups.push(vec![
                    InteractionSpec::new(
                        m1,
                        &conductive.acid,
                        &format!("{m1}-rise"),
                        &conductive.acid_spent,
                        1.0,
                    ),
                    InteractionSpec::new(
                        &format!("{m1}-charged"),
                        &conductive.base,
                        &format!("{m1}-fall"),
                        &conductive.base_spent,
                        1.0,
                    ),
                ]);
                for m2 in &conductive.materials {
                    let excluded = conductive.excluded.iter().any(|(x, y)| {
                        (x == m1 && y == m2) || (x == m2 && y == m1)
                    });
                    if excluded {
                        continue;
                    }
                    groups.push(vec![
                        InteractionSpec::new(
                            &format!("{m1}-fall"),
                            &format!("{m2}-charged"),
                            &format!("{m1}-fall"),
                            &format!("{m2}-fall"),
                            1.0,
                        ),
                        InteractionSpec::new(
                            m1,
                            &format!("{m2}-rise"),
                            &format!("{m1}-rise"),
                            &format!("{m2}-rise"),
                            1.0,
                        ),
                        InteractionSpec::new(
                            &format!("{m1}-rise"),
                            &format!("{m2}-fall"),
                            &format!("{m1}-charged"),
                            m2,
                            1.0,
                        ),
                        InteractionSpec::new(
                            &format!("{m1}-charged"),
                            m2,
                            &format!("{m1}-fall"),
                            &format!("{m2}-rise"),
                            0.1,
                        ),
                    ]);
                }
            }
        }

        for melter in &generators.melters {
            for meltable in &generators.meltables {
                groups.push(vec![InteractionSpec::new(
                    melter,
                    &meltable.name,
                    melter,
                    &meltable.turn_to,
                    meltable.prob,
                )]);
            }
        }

        if let Some(soluble) = &generators.lava_soluble {
            for metal in &soluble.metals {
                for dissolved in [metal.clone(), format!("{metal}-charged")] {
                    groups.push(vec![InteractionSpec::new(
                        &dissolved,
                        &soluble.lava,
                        &soluble.lava,
                        &soluble.lava,
                        soluble.prob,
                    )]);
                }
            }
        }

        groups.into_iter().rev().flatten().collect()
    }
}
