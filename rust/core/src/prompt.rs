// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Instruction text sent to the vision model.

use crate::Measurements;

/// System message for every analyze call.
pub const SYSTEM_PROMPT: &str = "Eres un experto en carpintería.";

/// Output contract embedded in every prompt. Field names match [`crate::Piece`].
const OUTPUT_FORMAT: &str = r#"[
  {
    "pieza": "nombre de la pieza",
    "cantidad": numero,
    "dimensiones": "LxAxP (mm)",
    "espesor": "N mm",
    "corte": "sierra|CNC",
    "observaciones": "detalle opcional"
  }
]"#;

/// Builds the user instruction for one furniture photo.
///
/// Total on any input: empty fields are interpolated as empty strings.
pub fn build_prompt(measurements: &Measurements) -> String {
    format!(
        "Eres un experto carpintero. Analiza la imagen adjunta de un mueble y, con base en \
las medidas y la descripción, genera un despiece tentativo. RESPONDE SOLO con un ARRAY JSON \
(sin texto adicional, sin markdown) en este formato EXACTO:
{format}
Cada \"cantidad\" debe ser un entero mayor o igual a 1 y \"corte\" debe ser \"sierra\" o \"CNC\".
Medidas (mm): ancho={width}, alto={height}, profundidad={depth}
Material: {material}
Descripción: {description}
",
        format = OUTPUT_FORMAT,
        width = measurements.width,
        height = measurements.height,
        depth = measurements.depth,
        material = measurements.material,
        description = measurements.description,
    )
}
