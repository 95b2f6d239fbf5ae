use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

pub fn build_cli() -> ArgMatches<'static> {
	App::new("pairgan")
		.version("v0.1.0")
		.about("A conditional adversarial network for paired image-to-image translation")
		.settings(&[AppSettings::SubcommandRequiredElseHelp, AppSettings::VersionlessSubcommands])
		.subcommand(build_train_subcommand())
		.subcommand(build_test_subcommand())
		.subcommand(build_export_subcommand())
		.get_matches()
}

fn build_train_subcommand() -> App<'static, 'static> {
	SubCommand::with_name("train")
		.about("Train a translation network on a folder of paired images")
		.arg(
			Arg::with_name("INPUT_DIR")
				.required(true)
				.index(1)
				.help("Folder of 64x512 paired images (two 64x256 halves side by side)"),
		)
		.arg(
			Arg::with_name("OUTPUT_DIR")
				.required(true)
				.index(2)
				.help("Checkpoints, summaries and display images are written here"),
		)
		.arg(build_checkpoint_arg().help("Resume training from the checkpoint in this folder"))
		.arg(build_seed_arg())
		.arg(build_max_steps_arg())
		.arg(build_max_epochs_arg())
		.arg(build_max_examples_arg())
		.arg(build_batch_size_arg())
		.arg(build_direction_arg())
		.arg(build_arch_arg())
		.arg(build_ngf_arg())
		.arg(build_ndf_arg())
		.arg(
			Arg::with_name("LEARNING_RATE")
				.short("R")
				.long("rate")
				.help("Adam learning rate for both optimizers. Default: 0.002")
				.empty_values(false),
		)
		.arg(
			Arg::with_name("BETA1")
				.long("beta1")
				.help("Adam first-moment decay. Default: 0.9")
				.empty_values(false),
		)
		.arg(
			Arg::with_name("L1_WEIGHT")
				.long("l1-weight")
				.help("Weight of the L1 reconstruction term. Default: 1.0")
				.empty_values(false),
		)
		.arg(
			Arg::with_name("GAN_WEIGHT")
				.long("gan-weight")
				.help("Weight of the adversarial term; 0 disables the discriminator. Default: 1.0")
				.empty_values(false),
		)
		.arg(
			Arg::with_name("DROPOUT")
				.long("dropout")
				.help("Dropout rate in the highway stages. Default: 0.5")
				.empty_values(false),
		)
		.arg(
			Arg::with_name("RECON_REFERENCE")
				.long("recon-reference")
				.possible_values(&["target", "source"])
				.help("Image the reconstruction loss compares against. Default: target")
				.empty_values(false),
		)
		.arg(
			Arg::with_name("SUMMARY_FREQ")
				.long("summary-freq")
				.help("Write loss summaries every n steps (0 disables). Default: 400")
				.empty_values(false),
		)
		.arg(
			Arg::with_name("PROGRESS_FREQ")
				.long("progress-freq")
				.help("Log progress every n steps (0 disables). Default: 200")
				.empty_values(false),
		)
		.arg(
			Arg::with_name("TRACE_FREQ")
				.long("trace-freq")
				.help("Log step timings every n steps (0 disables). Default: 0")
				.empty_values(false),
		)
		.arg(
			Arg::with_name("DISPLAY_FREQ")
				.long("display-freq")
				.help("Write current input/output/target images every n steps (0 disables). Default: 0")
				.empty_values(false),
		)
		.arg(
			Arg::with_name("SAVE_FREQ")
				.long("save-freq")
				.help("Save a checkpoint every n steps. Default: 200")
				.empty_values(false),
		)
		.arg(build_output_filetype_arg())
}

fn build_test_subcommand() -> App<'static, 'static> {
	SubCommand::with_name("test")
		.about("Run a trained network over a folder of paired images once, in order")
		.arg(
			Arg::with_name("INPUT_DIR")
				.required(true)
				.index(1)
				.help("Folder of 64x512 paired images to evaluate"),
		)
		.arg(
			Arg::with_name("OUTPUT_DIR")
				.required(true)
				.index(2)
				.help("Image triplets and an index.html are written here"),
		)
		.arg(
			build_checkpoint_arg()
				.required(true)
				.help("Folder holding the trained checkpoint (required)"),
		)
		.arg(build_max_examples_arg())
		.arg(build_batch_size_arg())
		.arg(build_direction_arg())
		.arg(build_arch_arg())
		.arg(build_ngf_arg())
		.arg(build_ndf_arg())
		.arg(build_output_filetype_arg())
}

fn build_export_subcommand() -> App<'static, 'static> {
	SubCommand::with_name("export")
		.about("Freeze a trained generator into a standalone inference artifact")
		.arg(
			Arg::with_name("OUTPUT_DIR")
				.required(true)
				.index(1)
				.help("The generator record and export.json manifest are written here"),
		)
		.arg(
			build_checkpoint_arg()
				.required(true)
				.help("Folder holding the trained checkpoint (required)"),
		)
		.arg(build_direction_arg())
		.arg(build_arch_arg())
		.arg(build_ngf_arg())
		.arg(build_output_filetype_arg())
}

fn build_checkpoint_arg() -> Arg<'static, 'static> {
	Arg::with_name("CHECKPOINT")
		.short("c")
		.long("checkpoint")
		.value_name("FOLDER")
		.empty_values(false)
}

fn build_seed_arg() -> Arg<'static, 'static> {
	Arg::with_name("SEED")
		.long("seed")
		.help("Seed for weight initialisation and shuffling. Default: random")
		.empty_values(false)
}

fn build_max_steps_arg() -> Arg<'static, 'static> {
	Arg::with_name("MAX_STEPS")
		.long("max-steps")
		.help("Stop after this many training steps")
		.empty_values(false)
}

fn build_max_epochs_arg() -> Arg<'static, 'static> {
	Arg::with_name("MAX_EPOCHS")
		.long("max-epochs")
		.conflicts_with("MAX_STEPS")
		.help("Stop after this many passes over the input set")
		.empty_values(false)
}

fn build_max_examples_arg() -> Arg<'static, 'static> {
	Arg::with_name("MAX_EXAMPLES")
		.long("max-examples")
		.help("Use only the first n input files")
		.empty_values(false)
}

fn build_batch_size_arg() -> Arg<'static, 'static> {
	Arg::with_name("BATCH_SIZE")
		.short("b")
		.long("batch-size")
		.help("Number of paired images per step. Default: 100")
		.empty_values(false)
}

fn build_direction_arg() -> Arg<'static, 'static> {
	Arg::with_name("DIRECTION")
		.short("d")
		.long("direction")
		.possible_values(&["AtoB", "BtoA"])
		.help("Which half of each pair is the source domain. Default: AtoB")
		.empty_values(false)
}

fn build_arch_arg() -> Arg<'static, 'static> {
	Arg::with_name("ARCH")
		.short("a")
		.long("arch")
		.possible_values(&["convolution", "lstm"])
		.help("Generator/discriminator architecture. Default: convolution")
		.empty_values(false)
}

fn build_ngf_arg() -> Arg<'static, 'static> {
	Arg::with_name("NGF")
		.long("ngf")
		.help("Generator width multiplier. Default: 96")
		.empty_values(false)
}

fn build_ndf_arg() -> Arg<'static, 'static> {
	Arg::with_name("NDF")
		.long("ndf")
		.help("Discriminator width multiplier. Default: 96")
		.empty_values(false)
}

fn build_output_filetype_arg() -> Arg<'static, 'static> {
	Arg::with_name("OUTPUT_FILETYPE")
		.long("output-filetype")
		.possible_values(&["png", "jpeg"])
		.help("Format for written images. Default: png")
		.empty_values(false)
}
