use anyhow::Result;
use erddap::{ErddapDataset, ReadOptions, Tabledap};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

fn main() -> Result<()> {
    // Example program that calls the library API against the public NOAA server.
    TermLogger::init(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    let mut remote = Tabledap::connect("https://coastwatch.pfeg.noaa.gov/erddap", "cwwcNDBCMet")?;
    println!("{}", remote);

    remote
        .set_result_variables(["station", "time", "atmp"])
        .add_constraint("time>=2020-12-24T00:00:00Z")
        .add_constraint("time<=2020-12-31T01:15:00Z")
        .order_by_closest(["station", "time/1day"]);
    println!("{}", remote.data_request_url());

    let table = remote.fetch_table(&ReadOptions::default())?;
    println!("{} rows, columns {:?}", table.len(), table.columns());
    for row in table.rows().iter().take(5) {
        println!("{}", row.join("\t"));
    }
    Ok(())
}
