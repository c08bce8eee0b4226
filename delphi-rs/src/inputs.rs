//! CSV readers for the tables that feed a batch run.
//!
//! Readers are generic over `io::Read` so they work on files and in-memory
//! buffers alike. Absent files and absent rows are not errors here: the
//! corresponding `LocationInput` field is left empty and the location is
//! skipped later. Malformed tables are errors.
use crate::{
    params::{CurrentPolicyMap, ParamLayout},
    prelude::{Date, DelphiError, Real, Result},
    scenario::{History, HistoryRow, LocationInput, LocationKey, ParameterRecord},
};
use csv::StringRecord;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    io,
    path::{Path, PathBuf},
};

/// Locations of the input tables.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct InputPaths {
    /// Directory holding one `Cases_{country}_{province}.csv` per location.
    pub cases_dir: PathBuf,
    /// Fitted parameter table.
    pub parameters: PathBuf,
    /// Population table (`Country`, `Province`, `pop2016`).
    pub population: PathBuf,
    /// Current policy of each location (`country`, `province`, `policy`).
    pub current_policies: PathBuf,
    /// Model states of a previous run. When given, it also defines the list
    /// of locations.
    pub prior_states: Option<PathBuf>,
}

impl Default for InputPaths {
    fn default() -> Self {
        InputPaths {
            cases_dir: "data/cases".into(),
            parameters: "data/parameters.csv".into(),
            population: "data/population.csv".into(),
            current_policies: "data/current_policies.csv".into(),
            prior_states: None,
        }
    }
}

type LocationIndex<T> = BTreeMap<(String, String), T>;

/// Path of the case table of a location. Spaces in names become underscores.
pub fn history_path(dir: &Path, key: &LocationKey) -> PathBuf {
    dir.join(format!(
        "Cases_{}_{}.csv",
        key.country.replace(' ', "_"),
        key.province.replace(' ', "_")
    ))
}

/// Read a case table. Columns other than `date`, `day_since100`, `case_cnt`
/// and `death_cnt` are ignored.
pub fn read_history<R: io::Read>(rdr: R) -> Result<History> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut rows = vec![];
    for res in reader.deserialize() {
        let row: HistoryRow = res?;
        rows.push(row);
    }
    Ok(History::new(rows))
}

/// Read the fitted parameter table.
///
/// Columns 0 to 3 are continent, country, province and the date the fit is
/// anchored at. Fitted values start at the column given by `layout`. When a
/// location appears more than once, the last row wins.
pub fn read_parameters<R: io::Read>(
    rdr: R,
    layout: ParamLayout,
) -> Result<LocationIndex<(String, ParameterRecord)>> {
    let mut reader = csv::Reader::from_reader(rdr);
    let offset = layout.column_offset();
    let mut out = BTreeMap::new();
    for res in reader.records() {
        let record = res?;
        let field = |i: usize| record.get(i).unwrap_or("").trim();
        let anchor_date = parse_date(field(3))?;
        let values = record
            .iter()
            .skip(offset)
            .map(|s| parse_real(s, &record))
            .collect::<Result<Vec<_>>>()?;
        out.insert(
            (field(1).to_string(), field(2).to_string()),
            (
                field(0).to_string(),
                ParameterRecord {
                    anchor_date,
                    values,
                },
            ),
        );
    }
    Ok(out)
}

#[derive(Deserialize, Debug)]
struct PopulationRow {
    #[serde(rename = "Country")]
    country: String,
    #[serde(rename = "Province")]
    province: String,
    pop2016: Real,
}

/// Read the population table. The last row of a location wins.
pub fn read_population<R: io::Read>(rdr: R) -> Result<HashMap<(String, String), Real>> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut out = HashMap::new();
    for res in reader.deserialize() {
        let row: PopulationRow = res?;
        out.insert((row.country, row.province), row.pop2016);
    }
    Ok(out)
}

#[derive(Deserialize, Debug)]
struct PolicyRow {
    country: String,
    province: String,
    policy: String,
}

/// Read the current policy of each location.
pub fn read_current_policies<R: io::Read>(rdr: R) -> Result<CurrentPolicyMap> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut out = CurrentPolicyMap::new();
    for res in reader.deserialize() {
        let row: PolicyRow = res?;
        out.insert(row.country, row.province, row.policy);
    }
    Ok(out)
}

/// Read model states of a previous run as (location, recovered) pairs.
///
/// Locations are listed in file order. A row with an empty `S` column has no
/// usable prior state and yields `None`.
pub fn read_prior_states<R: io::Read>(rdr: R) -> Result<Vec<(LocationKey, Option<Real>)>> {
    let mut reader = csv::Reader::from_reader(rdr);
    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                DelphiError::Configuration(format!("prior states lack a {} column", name))
            })
    };
    let continent = column("continent")?;
    let country = column("country")?;
    let province = column("province")?;
    let (s, r) = (column("S")?, column("R")?);

    let mut out = vec![];
    for res in reader.records() {
        let record = res?;
        let field = |i: usize| record.get(i).unwrap_or("").trim();
        let key = LocationKey::new(field(continent), field(country), field(province));
        let recovered = if field(s).is_empty() {
            None
        } else {
            Some(parse_real(field(r), &record)?)
        };
        out.push((key, recovered));
    }
    Ok(out)
}

/// Read every table and assemble the per-location inputs.
pub fn load_inputs(
    paths: &InputPaths,
    layout: ParamLayout,
) -> Result<(Vec<LocationInput>, CurrentPolicyMap)> {
    let parameters = read_parameters(File::open(&paths.parameters)?, layout)?;
    let population = read_population(File::open(&paths.population)?)?;
    let policies = read_current_policies(File::open(&paths.current_policies)?)?;
    info!(
        "read {} parameter rows, {} populations, {} current policies",
        parameters.len(),
        population.len(),
        policies.len()
    );

    let locations: Vec<(LocationKey, Option<Real>)> = match &paths.prior_states {
        Some(path) => read_prior_states(File::open(path)?)?,
        None => parameters
            .iter()
            .map(|((country, province), (continent, _))| {
                (LocationKey::new(continent, country, province), None)
            })
            .collect(),
    };

    let mut inputs = Vec::with_capacity(locations.len());
    for (key, prior_recovered) in locations {
        let id = (key.country.clone(), key.province.clone());
        let path = history_path(&paths.cases_dir, &key);
        let history = if path.exists() {
            Some(read_history(File::open(&path)?)?)
        } else {
            debug!("no case table for {} at {}", key, path.display());
            None
        };
        let mut input = LocationInput::new(key);
        input.population = population.get(&id).copied();
        input.parameters = parameters.get(&id).map(|(_, record)| record.clone());
        input.history = history;
        input.prior_recovered = prior_recovered;
        inputs.push(input);
    }
    Ok((inputs, policies))
}

fn parse_date(s: &str) -> Result<Date> {
    // Tables written by spreadsheet tools sometimes carry a time component.
    let day = s.split_whitespace().next().unwrap_or(s);
    Ok(Date::parse_from_str(day, "%Y-%m-%d")?)
}

fn parse_real(s: &str, record: &StringRecord) -> Result<Real> {
    s.trim().parse::<Real>().map_err(|_| {
        DelphiError::Configuration(format!(
            "cannot parse {:?} as a number in row {:?}",
            s,
            record.position().map(|p| p.line())
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn history_ignores_extra_columns() {
        let data = "\
country,province,date,day_since100,case_cnt,death_cnt,tested
France,None,2020-10-02,41,1100,21,5
France,None,2020-10-01,40,1000,20,4
";
        let history = read_history(data.as_bytes()).unwrap();
        assert_eq!(history.rows().len(), 2);
        assert_eq!(history.rows()[0].day_since100, 40);
        assert_eq!(history.last_date(), Date::from_ymd_opt(2020, 10, 2));
        assert_approx_eq!(history.rows()[1].cases, 1100.0, 1e-12);
    }

    #[test]
    fn parameter_layouts() {
        let python = "\
Continent,Country,Province,Data Start Date,MAPE,a,b,c,d,e,f,g,h,i,j,k,l
Europe,France,None,2020-09-15,3.2,1,2,3,4,5,6,7,8,9,10,11,12
Europe,France,None,2020-10-01,2.1,1,2,3,0.2,5,6,7,8,9,10,11,12
";
        let table = read_parameters(python.as_bytes(), ParamLayout::Python).unwrap();
        assert_eq!(table.len(), 1);
        let (continent, record) = &table[&("France".to_string(), "None".to_string())];
        assert_eq!(continent, "Europe");
        assert_eq!(record.anchor_date, Date::from_ymd_opt(2020, 10, 1).unwrap());
        assert_eq!(record.values.len(), 12);
        assert_eq!(record.values[3], 0.2);

        let mathematica = "\
Continent,Country,Province,Data Start Date,a,b,c,d,e,f,g,h,i,j,k,l
North America,US,New York,2020-09-15 00:00:00,1,2,3,4,5,6,7,8,9,10,11,12
";
        let table = read_parameters(mathematica.as_bytes(), ParamLayout::Mathematica).unwrap();
        let (_, record) = &table[&("US".to_string(), "New York".to_string())];
        assert_eq!(record.values[0], 1.0);
        assert_eq!(record.values.len(), 12);
    }

    #[test]
    fn malformed_parameter_is_an_error() {
        let data = "\
Continent,Country,Province,Data Start Date,MAPE,a
Europe,France,None,2020-10-01,2.1,oops
";
        assert!(matches!(
            read_parameters(data.as_bytes(), ParamLayout::Python),
            Err(DelphiError::Configuration(_))
        ));
    }

    #[test]
    fn population_and_policies() {
        let pop = "Continent,Country,Province,pop2016\nEurope,France,None,66990000\n";
        let pop = read_population(pop.as_bytes()).unwrap();
        assert_eq!(pop[&("France".to_string(), "None".to_string())], 66_990_000.0);

        let policies = "country,province,policy\nUS,Texas,Lockdown\nFrance,None,No_Measure\n";
        let policies = read_current_policies(policies.as_bytes()).unwrap();
        assert_eq!(policies.len(), 2);
        assert_eq!(policies.get("US", "Texas"), Some("Lockdown"));
        assert_eq!(policies.get("US", "Ohio"), None);
    }

    #[test]
    fn prior_states_without_state_yield_none() {
        let data = "\
continent,country,province,S,E,I,AR,DHR,DQR,AD,DHD,DQD,R,D,TH,DVR,DVD,DD,DT
Europe,France,None,9e5,1,1,1,1,1,1,1,1,4200,1,1,1,1,1,1
Europe,Spain,None,,,,,,,,,,,,,,,,
";
        let states = read_prior_states(data.as_bytes()).unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].0, LocationKey::new("Europe", "France", "None"));
        assert_eq!(states[0].1, Some(4200.0));
        assert_eq!(states[1].1, None);
    }

    #[test]
    fn case_file_names() {
        let key = LocationKey::new("North America", "US", "New York");
        assert_eq!(
            history_path(Path::new("cases"), &key),
            Path::new("cases").join("Cases_US_New_York.csv")
        );
    }
}
