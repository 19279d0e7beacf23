/// Maps a two-digit room type id to its name.
///
/// | Id | Room            |
/// |----|-----------------|
/// | 00 | Unknown         |
/// | 01 | MainBedroom     |
/// | 02 | Bedroom1        |
/// | 03 | Bedroom2        |
/// | 04 | LivingRoom      |
/// | 05 | FamilyRoom      |
/// | 06 | RecreationRoom  |
/// | 07 | Kitchen         |
/// | 08 | DiningRoom      |
/// | 09 | Den/Office      |
/// | 10 | MasterBathroom  |
/// | 11 | Bathroom        |
/// | 12 | Garage          |
/// | 13 | Patio           |
/// | 14 | Entryway        |
/// | 15 | Other           |
///
/// Any other id is `Unknown`.
pub fn room_type_name(id: &str) -> &'static str {
    match id {
        "01" => "MainBedroom",
        "02" => "Bedroom1",
        "03" => "Bedroom2",
        "04" => "LivingRoom",
        "05" => "FamilyRoom",
        "06" => "RecreationRoom",
        "07" => "Kitchen",
        "08" => "DiningRoom",
        "09" => "Den/Office",
        "10" => "MasterBathroom",
        "11" => "Bathroom",
        "12" => "Garage",
        "13" => "Patio",
        "14" => "Entryway",
        "15" => "Other",
        _ => "Unknown",
    }
}

/// Splits a `RR_MAC_rssi` column name into room id and station MAC.
pub fn parse_station_column(column: &str) -> Option<(&str, &str)> {
    let parts: Vec<&str> = column.split('_').collect();
    if parts.len() < 3 {
        return None;
    }
    Some((parts[0], parts[1]))
}
