mod run;
mod sites;
