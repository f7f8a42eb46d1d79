//! Per-cycle summary figures
//!
//! Aggregates the concatenated general and skills tables into what the
//! dashboard displays next to its charts. Missing values are skipped, never
//! treated as zero in a mean.

use serde::Serialize;

use painel_common::Cycle;

use super::normalizer::{number, text, ResultRow, CYCLE_COLUMN, STAGE_COLUMN};

/// Number of skills listed in each ranking
pub const RANKING_SIZE: usize = 5;

/// Entity card, read from the first general row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityInfo {
    /// `NM_ENTIDADE`
    pub nome: Option<String>,
    /// `VL_FILTRO_ETAPA`, stage prefix already stripped
    pub etapa: Option<String>,
    /// `VL_FILTRO_DISCIPLINA`
    pub componente: Option<String>,
}

/// Mean hit rate (`TX_ACERTOS`) of one cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProficiencySummary {
    pub ciclo: &'static str,
    pub media: Option<f64>,
    /// Difference to the 1º Ciclo mean; `None` for the first cycle itself
    /// and whenever either mean is unknown
    pub delta: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipationSummary {
    pub ciclo: &'static str,
    pub taxa_participacao: Option<f64>,
    pub previstos: f64,
    pub efetivos: f64,
}

/// Mean number of students per learning level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelSummary {
    pub ciclo: &'static str,
    /// `NU_N01`
    pub defasagem: Option<f64>,
    /// `NU_N02`
    pub intermediario: Option<f64>,
    /// `NU_N03`
    pub adequado: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillEntry {
    pub cd_habilidade: Option<String>,
    pub dc_habilidade: Option<String>,
    /// Hit rate rounded to one decimal place
    pub tx_acerto: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillRanking {
    pub ciclo: &'static str,
    pub melhores: Vec<SkillEntry>,
    pub piores: Vec<SkillEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub entidade: Option<EntityInfo>,
    pub proficiencia: Vec<ProficiencySummary>,
    pub participacao: Vec<ParticipationSummary>,
    pub niveis: Vec<LevelSummary>,
    pub habilidades: Vec<SkillRanking>,
}

pub fn summarize(general: &[ResultRow], skills: &[ResultRow]) -> Summary {
    let mut summary = Summary {
        entidade: general.first().map(entity_info),
        ..Summary::default()
    };
    let first_cycle_mean = mean(&rows_for(general, Cycle::First), "TX_ACERTOS");

    for cycle in Cycle::ALL {
        let rows = rows_for(general, cycle);
        if !rows.is_empty() {
            let media = mean(&rows, "TX_ACERTOS");
            let delta = match cycle {
                Cycle::First => None,
                _ => media.zip(first_cycle_mean).map(|(m, base)| m - base),
            };
            summary.proficiencia.push(ProficiencySummary {
                ciclo: cycle.label(),
                media,
                delta,
            });
            summary.participacao.push(ParticipationSummary {
                ciclo: cycle.label(),
                taxa_participacao: mean(&rows, "TX_PARTICIPACAO"),
                previstos: sum(&rows, "QT_PREVISTO"),
                efetivos: sum(&rows, "QT_EFETIVO"),
            });
            summary.niveis.push(LevelSummary {
                ciclo: cycle.label(),
                defasagem: mean(&rows, "NU_N01"),
                intermediario: mean(&rows, "NU_N02"),
                adequado: mean(&rows, "NU_N03"),
            });
        }

        let rows = rows_for(skills, cycle);
        if !rows.is_empty() {
            summary.habilidades.push(rank_skills(&rows, cycle));
        }
    }

    summary
}

fn entity_info(row: &ResultRow) -> EntityInfo {
    EntityInfo {
        nome: text(row, "NM_ENTIDADE"),
        etapa: text(row, STAGE_COLUMN),
        componente: text(row, "VL_FILTRO_DISCIPLINA"),
    }
}

fn rows_for(rows: &[ResultRow], cycle: Cycle) -> Vec<&ResultRow> {
    rows.iter()
        .filter(|row| row.get(CYCLE_COLUMN).and_then(|v| v.as_str()) == Some(cycle.label()))
        .collect()
}

fn mean(rows: &[&ResultRow], field: &str) -> Option<f64> {
    let values: Vec<f64> = rows.iter().filter_map(|row| number(row, field)).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn sum(rows: &[&ResultRow], field: &str) -> f64 {
    rows.iter().filter_map(|row| number(row, field)).sum()
}

fn rank_skills(rows: &[&ResultRow], cycle: Cycle) -> SkillRanking {
    let mut rated: Vec<(&ResultRow, f64)> = rows
        .iter()
        .filter_map(|row| number(row, "TX_ACERTO").map(|rate| (*row, rate)))
        .collect();

    // Stable sorts keep upstream order among ties
    rated.sort_by(|a, b| b.1.total_cmp(&a.1));
    let melhores = rated.iter().take(RANKING_SIZE).map(skill_entry).collect();

    rated.sort_by(|a, b| a.1.total_cmp(&b.1));
    let piores = rated.iter().take(RANKING_SIZE).map(skill_entry).collect();

    SkillRanking {
        ciclo: cycle.label(),
        melhores,
        piores,
    }
}

fn skill_entry((row, rate): &(&ResultRow, f64)) -> SkillEntry {
    SkillEntry {
        cd_habilidade: text(row, "CD_HABILIDADE"),
        dc_habilidade: text(row, "DC_HABILIDADE"),
        tx_acerto: (rate * 10.0).round() / 10.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn row(value: Value) -> ResultRow {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_participation_per_cycle() {
        let general = vec![
            row(json!({"Ciclo": "1º Ciclo", "TX_PARTICIPACAO": 90.0, "QT_PREVISTO": 100.0, "QT_EFETIVO": 90.0})),
            row(json!({"Ciclo": "1º Ciclo", "TX_PARTICIPACAO": 80.0, "QT_PREVISTO": 50.0, "QT_EFETIVO": 40.0})),
            row(json!({"Ciclo": "3º Ciclo", "TX_PARTICIPACAO": null, "QT_PREVISTO": null, "QT_EFETIVO": 10.0})),
        ];

        let summary = summarize(&general, &[]);

        assert_eq!(summary.participacao.len(), 2);
        assert_eq!(summary.participacao[0].ciclo, "1º Ciclo");
        assert_eq!(summary.participacao[0].taxa_participacao, Some(85.0));
        assert_eq!(summary.participacao[0].previstos, 150.0);
        assert_eq!(summary.participacao[0].efetivos, 130.0);

        assert_eq!(summary.participacao[1].ciclo, "3º Ciclo");
        assert_eq!(summary.participacao[1].taxa_participacao, None);
        assert_eq!(summary.participacao[1].previstos, 0.0);
        assert_eq!(summary.participacao[1].efetivos, 10.0);
    }

    #[test]
    fn test_level_means_skip_missing() {
        let general = vec![
            row(json!({"Ciclo": "2º Ciclo", "NU_N01": 10.0, "NU_N02": 20.0, "NU_N03": null})),
            row(json!({"Ciclo": "2º Ciclo", "NU_N01": 20.0, "NU_N02": null, "NU_N03": null})),
        ];

        let summary = summarize(&general, &[]);

        assert_eq!(
            summary.niveis,
            vec![LevelSummary {
                ciclo: "2º Ciclo",
                defasagem: Some(15.0),
                intermediario: Some(20.0),
                adequado: None,
            }]
        );
    }

    #[test]
    fn test_skill_rankings() {
        let skills: Vec<ResultRow> = (1..=7)
            .map(|i| {
                row(json!({
                    "Ciclo": "1º Ciclo",
                    "CD_HABILIDADE": format!("H{:02}", i),
                    "DC_HABILIDADE": format!("Habilidade {}", i),
                    "TX_ACERTO": i as f64 * 10.04
                }))
            })
            .chain(std::iter::once(row(json!({
                "Ciclo": "1º Ciclo",
                "CD_HABILIDADE": "H99",
                "TX_ACERTO": null
            }))))
            .collect();

        let summary = summarize(&[], &skills);
        assert_eq!(summary.habilidades.len(), 1);
        let ranking = &summary.habilidades[0];

        let best: Vec<_> = ranking.melhores.iter().map(|e| e.cd_habilidade.clone().unwrap()).collect();
        let worst: Vec<_> = ranking.piores.iter().map(|e| e.cd_habilidade.clone().unwrap()).collect();
        assert_eq!(best, vec!["H07", "H06", "H05", "H04", "H03"]);
        assert_eq!(worst, vec!["H01", "H02", "H03", "H04", "H05"]);
        assert_eq!(ranking.melhores[0].tx_acerto, 70.3);
    }

    #[test]
    fn test_rows_without_known_cycle_are_ignored() {
        let general = vec![row(json!({"Ciclo": "9º Ciclo", "TX_PARTICIPACAO": 50.0, "TX_ACERTOS": 70.0}))];
        let summary = summarize(&general, &[]);
        assert!(summary.proficiencia.is_empty());
        assert!(summary.participacao.is_empty());
        assert!(summary.niveis.is_empty());
    }

    #[test]
    fn test_proficiency_delta_against_first_cycle() {
        let general = vec![
            row(json!({"Ciclo": "1º Ciclo", "TX_ACERTOS": 50.0})),
            row(json!({"Ciclo": "1º Ciclo", "TX_ACERTOS": 60.0})),
            row(json!({"Ciclo": "1º Ciclo", "TX_ACERTOS": null})),
            row(json!({"Ciclo": "2º Ciclo", "TX_ACERTOS": 62.5})),
            row(json!({"Ciclo": "3º Ciclo", "TX_ACERTOS": null})),
        ];

        let summary = summarize(&general, &[]);

        assert_eq!(
            summary.proficiencia,
            vec![
                ProficiencySummary { ciclo: "1º Ciclo", media: Some(55.0), delta: None },
                ProficiencySummary { ciclo: "2º Ciclo", media: Some(62.5), delta: Some(7.5) },
                ProficiencySummary { ciclo: "3º Ciclo", media: None, delta: None },
            ]
        );
    }

    #[test]
    fn test_proficiency_without_first_cycle_has_no_delta() {
        let general = vec![
            row(json!({"Ciclo": "2º Ciclo", "TX_ACERTOS": 40.0})),
            row(json!({"Ciclo": "3º Ciclo", "TX_ACERTOS": 48.0})),
        ];

        let summary = summarize(&general, &[]);

        assert_eq!(summary.proficiencia.len(), 2);
        assert_eq!(summary.proficiencia[0].media, Some(40.0));
        assert!(summary.proficiencia.iter().all(|p| p.delta.is_none()));
    }

    #[test]
    fn test_entity_info_from_first_general_row() {
        let general = vec![
            row(json!({
                "Ciclo": "1º Ciclo",
                "NM_ENTIDADE": "ESCOLA TESTE",
                "VL_FILTRO_ETAPA": "3º ANO",
                "VL_FILTRO_DISCIPLINA": "MATEMÁTICA"
            })),
            row(json!({"Ciclo": "2º Ciclo", "NM_ENTIDADE": "OUTRA"})),
        ];

        let summary = summarize(&general, &[]);

        assert_eq!(
            summary.entidade,
            Some(EntityInfo {
                nome: Some("ESCOLA TESTE".into()),
                etapa: Some("3º ANO".into()),
                componente: Some("MATEMÁTICA".into()),
            })
        );
    }

    #[test]
    fn test_entity_info_missing_fields() {
        let general = vec![row(json!({"Ciclo": "1º Ciclo", "NM_ENTIDADE": "ESCOLA TESTE"}))];

        let entidade = summarize(&general, &[]).entidade.unwrap();

        assert_eq!(entidade.nome.as_deref(), Some("ESCOLA TESTE"));
        assert_eq!(entidade.etapa, None);
        assert_eq!(entidade.componente, None);
        assert_eq!(summarize(&[], &[]).entidade, None);
    }
}
