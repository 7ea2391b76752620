//! Static airport-code → coordinate table for route display
//!
//! Covers the main Mexican airports by ICAO code. Coordinates are the
//! published aerodrome reference points, rounded to four decimals.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

const AIRPORTS: &[(&str, f64, f64)] = &[
    ("MMMX", 19.4361, -99.0719),  // Ciudad de México (AICM)
    ("MMSM", 19.7458, -99.0145),  // Felipe Ángeles (AIFA)
    ("MMGL", 20.5218, -103.3112), // Guadalajara
    ("MMMY", 25.7785, -100.1069), // Monterrey
    ("MMUN", 21.0365, -86.8771),  // Cancún
    ("MMTJ", 32.5411, -116.9700), // Tijuana
    ("MMSD", 23.1518, -109.7210), // San José del Cabo
    ("MMPR", 20.6801, -105.2544), // Puerto Vallarta
    ("MMMD", 20.9370, -89.6577),  // Mérida
    ("MMTO", 19.3371, -99.5660),  // Toluca
    ("MMHO", 29.0959, -111.0480), // Hermosillo
    ("MMCZ", 20.5224, -86.9256),  // Cozumel
    ("MMOX", 16.9999, -96.7266),  // Oaxaca
    ("MMAA", 16.7571, -99.7540),  // Acapulco
    ("MMZH", 17.6016, -101.4606), // Zihuatanejo
    ("MMMZ", 23.1614, -106.2661), // Mazatlán
    ("MMCU", 28.7029, -105.9646), // Chihuahua
    ("MMCL", 24.7645, -107.4747), // Culiacán
    ("MMVR", 19.1459, -96.1873),  // Veracruz
    ("MMVA", 17.9970, -92.8174),  // Villahermosa
    ("MMTG", 16.5636, -93.0225),  // Tuxtla Gutiérrez
    ("MMTP", 14.7943, -92.3700),  // Tapachula
    ("MMBT", 15.7753, -96.2626),  // Huatulco
    ("MMQT", 20.6173, -100.1857), // Querétaro
    ("MMLO", 20.9935, -101.4809), // León / Bajío
    ("MMAS", 21.7056, -102.3180), // Aguascalientes
    ("MMSP", 22.2543, -100.9308), // San Luis Potosí
    ("MMCP", 19.8168, -90.5003),  // Campeche
    ("MMCM", 18.5047, -88.3268),  // Chetumal
    ("MMLP", 24.0727, -110.3625), // La Paz
    ("MMPB", 19.1581, -98.3714),  // Puebla
    ("MMZC", 22.8971, -102.6869), // Zacatecas
    ("MMDO", 24.1242, -104.5280), // Durango
    ("MMTC", 25.5683, -103.4106), // Torreón
    ("MMMM", 19.8499, -101.0254), // Morelia
    ("MMCE", 18.6537, -91.7990),  // Ciudad del Carmen
    ("MMML", 32.6306, -115.2416), // Mexicali
    ("MMCS", 31.6361, -106.4289), // Ciudad Juárez
    ("MMRX", 26.0089, -98.2285),  // Reynosa
    ("MMTM", 22.2964, -97.8659),  // Tampico
    ("MMNL", 27.4439, -99.5705),  // Nuevo Laredo
    ("MMLM", 25.6852, -109.0808), // Los Mochis
    ("MMMA", 25.7699, -97.5253),  // Matamoros
    ("MMIA", 19.2770, -103.5770), // Colima
];

/// Look up an airport by ICAO code (case-insensitive)
pub fn lookup(code: &str) -> Option<Coordinates> {
    let code = code.trim();
    AIRPORTS
        .iter()
        .find(|(icao, _, _)| icao.eq_ignore_ascii_case(code))
        .map(|&(_, lat, lng)| Coordinates { lat, lng })
}
